//! System and user prompts for question-paper generation.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth**: changing a formatting rule (say, how
//!    options are laid out) requires editing exactly one place.
//!
//! 2. **Testability**: unit tests inspect the assembled instruction directly
//!    without calling the model, so prompt regressions are easy to catch.
//!
//! The system instruction is assembled from fixed blocks:
//!
//! ```text
//! requirements (institution, count, language, type, custom prompt)
//! [single-line XOR multi-line objective block]   Objective / Mixed only
//! [math block]                                    is_math_paper only
//! subjective + general formatting rules
//! answer section rules (delimiter)
//! ```

use crate::config::{GenerationConfig, ObjectiveLayout};

/// Literal token separating the questions from the answer key in the output.
pub const ANSWER_DELIMITER: &str = "---ANSWERS---";

/// Objective layout block: question and all options on one line.
pub const SINGLE_LINE_OBJECTIVE_BLOCK: &str = r#"For ALL objective questions:
- Present the question number, the full question text, and ALL its options (e.g., A, B, C, D) STRICTLY on the SAME SINGLE LINE.
- DO NOT wrap the question or options to new lines within that single line. Ensure conciseness to fit.
- Each new objective question (number, question, and its options) MUST start on a new line.
- Example for single-line objective question:
  1. What is the capital of France? A) London B) Paris C) Berlin D) Rome
  2. Which gas do plants absorb? A) Oxygen B) Carbon Dioxide C) Nitrogen D) Hydrogen
"#;

/// Objective layout block: question line, then one option per line.
pub const MULTI_LINE_OBJECTIVE_BLOCK: &str = r#"For ALL objective questions:
- Present the question number and the full question text on one line.
- Present EACH option (e.g., A, B, C, D) on a SEPARATE new line directly below the question.
- Each new objective question (number and question) MUST start on a new line.
- Example for multi-line objective question:
  1. What is the capital of France?
     A) London
     B) Paris
     C) Berlin
     D) Rome
  2. Which gas do plants absorb?
     A) Oxygen
     B) Carbon Dioxide
     C) Nitrogen
     D) Hydrogen
"#;

/// LaTeX notation block for math papers.
pub const MATH_BLOCK: &str = r#"MATHEMATICS CONTENT INSTRUCTIONS:
- For ALL mathematical expressions, equations, fractions, exponents, roots, integrals, summations, Greek letters, and special mathematical symbols, you MUST use LaTeX syntax.
- Enclose inline mathematical expressions in single dollar signs (e.g., $x^2 + y^2 = z^2$).
- Enclose display mathematical expressions (equations on their own line) in double dollar signs (e.g., $$ \int_{a}^{b} f(x) dx = F(b) - F(a) $$).
- Examples of LaTeX usage:
  - Fraction: $\frac{a}{b}$
  - Exponent: $x^n$
  - Square root: $\sqrt{x+y}$
  - Integral: $\int x^2 dx$
  - Summation: $\sum_{i=1}^{n} i = \frac{n(n+1)}{2}$
  - Common symbols: $\pm, \times, \div, \approx, \le, \ge, \rightarrow, \infty, \alpha, \beta, \theta$
- Ensure that LaTeX is correctly formatted and complete for proper rendering by MathJax.
- For example, a math question could be: "Solve the equation $x^2 - 5x + 6 = 0$." Or for a more complex one: "Calculate the value of $$ \lim_{x \to 0} \frac{\sin(x)}{x} $$"
"#;

const QUESTION_RULES: &str = r#"For subjective questions (if any):
- Simply list the question number and the question text. Each new subjective question should start on a new line. If it's a math paper, use LaTeX for math within subjective questions as well.

General Formatting for Questions:
- Ensure questions are diverse and cover different aspects of the provided text or image(s).
- Format the output clearly, with numbering for each question.
- Output ONLY the questions themselves in the question paper section. Do not include answers or correct options within the question paper.
- Adhere strictly to the formatting guidelines provided, especially for objective questions and LaTeX for math if applicable.
"#;

/// Build the system instruction for one generation call.
pub fn system_instruction(config: &GenerationConfig) -> String {
    let mut s = String::with_capacity(4096);

    s.push_str(
        "You are an expert AI Question Paper Generator. Your task is to create a high-quality \
question paper and a separate list of answers.\n\n",
    );
    s.push_str("QUESTION PAPER REQUIREMENTS:\n");
    s.push_str(&format!("- Institution: {}\n", config.institution_name));
    s.push_str(&format!("- Number of Questions: {}\n", config.num_questions));
    s.push_str(&format!("- Language: {}\n", config.language));
    s.push_str(&format!("- Question Type: {}\n", config.question_type));
    s.push_str(&format!(
        "- Specific Instructions from user: {}\n\n",
        config.custom_prompt
    ));

    if let Some(block) = objective_block(config) {
        s.push_str(block);
        s.push('\n');
    }
    if config.is_math_paper {
        s.push_str(MATH_BLOCK);
        s.push('\n');
    }

    s.push_str(QUESTION_RULES);
    s.push('\n');
    s.push_str(&answer_section_rules());
    s.push('\n');
    s.push_str(
        "Based on the following text content or image(s), generate the question paper first, \
then the answer section.\n",
    );
    s.push_str(&format!(
        "The entire output (questions, then delimiter, then answers) should be in {}.\n",
        config.language
    ));
    s
}

/// The objective formatting block for this config, if any.
///
/// Subjective papers get none; Objective and Mixed get exactly one.
pub fn objective_block(config: &GenerationConfig) -> Option<&'static str> {
    if !config.has_objective_questions() {
        return None;
    }
    Some(match config.objective_layout {
        ObjectiveLayout::SingleLine => SINGLE_LINE_OBJECTIVE_BLOCK,
        ObjectiveLayout::MultiLine => MULTI_LINE_OBJECTIVE_BLOCK,
    })
}

fn answer_section_rules() -> String {
    format!(
        "ANSWER SECTION REQUIREMENTS:\n\
- After generating ALL questions, you MUST provide a separate section for answers.\n\
- This section MUST start with the exact delimiter: {d}\n\
- After the delimiter, list the answers for all questions in the same order. For objective questions, \
clearly indicate the correct option (e.g., \"1. B\", \"2. A) Paris\"). For subjective questions, provide a \
concise model answer. If it's a math paper, use LaTeX for math within answers as well.\n\
- Example Answer Section:\n\
  {d}\n\
  1. B\n\
  2. A) Paris\n\
  3. (Model answer for a subjective question... for math, e.g., The solution is $x=2$ or $x=3$.)\n",
        d = ANSWER_DELIMITER
    )
}

/// User turn for the plain-text path. `source` must already be truncated.
pub fn text_user_prompt(source: &str, config: &GenerationConfig) -> String {
    format!(
        "Text Content to use for generating questions and answers:\n\
---\n\
{source}\n\
---\n\n\
Please generate the question paper and then the answer section according to ALL system instructions.\n\
Strictly adhere to the requested number of questions, formatting guidelines (including LaTeX if this is \
a math paper), and the answer section delimiter.\n\
Output everything in {language}.\n",
        language = config.language
    )
}

/// Trailing text part for the image path.
pub fn image_user_prompt(config: &GenerationConfig) -> String {
    format!(
        "Please generate the question paper and then the answer section according to ALL system instructions.\n\
The questions should be based on the content of the provided image(s).\n\
Strictly adhere to the requested number of questions, formatting guidelines (including LaTeX if this is \
a math paper), and the answer section delimiter.\n\
Output everything in {}.\n",
        config.language
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Language, QuestionType};

    fn cfg(qt: QuestionType, layout: ObjectiveLayout, math: bool) -> GenerationConfig {
        GenerationConfig::builder()
            .question_type(qt)
            .objective_layout(layout)
            .is_math_paper(math)
            .build()
            .unwrap()
    }

    #[test]
    fn objective_layout_blocks_are_exclusive() {
        for qt in [QuestionType::Objective, QuestionType::Mixed] {
            for layout in [ObjectiveLayout::SingleLine, ObjectiveLayout::MultiLine] {
                let s = system_instruction(&cfg(qt, layout, false));
                let single = s.contains(SINGLE_LINE_OBJECTIVE_BLOCK);
                let multi = s.contains(MULTI_LINE_OBJECTIVE_BLOCK);
                assert!(single ^ multi, "{qt:?}/{layout:?}: exactly one block expected");
                assert_eq!(single, layout == ObjectiveLayout::SingleLine);
            }
        }
    }

    #[test]
    fn subjective_has_no_layout_block() {
        for layout in [ObjectiveLayout::SingleLine, ObjectiveLayout::MultiLine] {
            let s = system_instruction(&cfg(QuestionType::Subjective, layout, false));
            assert!(!s.contains(SINGLE_LINE_OBJECTIVE_BLOCK));
            assert!(!s.contains(MULTI_LINE_OBJECTIVE_BLOCK));
        }
    }

    #[test]
    fn math_block_iff_math_paper() {
        for qt in [
            QuestionType::Objective,
            QuestionType::Subjective,
            QuestionType::Mixed,
        ] {
            let with = system_instruction(&cfg(qt, ObjectiveLayout::SingleLine, true));
            let without = system_instruction(&cfg(qt, ObjectiveLayout::SingleLine, false));
            assert!(with.contains(MATH_BLOCK));
            assert!(!without.contains("MATHEMATICS CONTENT INSTRUCTIONS"));
        }
    }

    #[test]
    fn math_and_layout_blocks_coexist() {
        let s = system_instruction(&cfg(
            QuestionType::Mixed,
            ObjectiveLayout::MultiLine,
            true,
        ));
        assert!(s.contains(MATH_BLOCK));
        assert!(s.contains(MULTI_LINE_OBJECTIVE_BLOCK));
    }

    #[test]
    fn instruction_is_parameterised() {
        let config = GenerationConfig::builder()
            .institution_name("Riverside Academy")
            .num_questions(7)
            .language(Language::French)
            .custom_prompt("Focus on chapter 3")
            .build()
            .unwrap();
        let s = system_instruction(&config);
        assert!(s.contains("- Institution: Riverside Academy"));
        assert!(s.contains("- Number of Questions: 7"));
        assert!(s.contains("- Language: French"));
        assert!(s.contains("Focus on chapter 3"));
        assert!(s.contains("should be in French."));
    }

    #[test]
    fn instruction_always_names_delimiter() {
        let s = system_instruction(&cfg(
            QuestionType::Subjective,
            ObjectiveLayout::SingleLine,
            false,
        ));
        assert!(s.contains(&format!("exact delimiter: {ANSWER_DELIMITER}")));
    }

    #[test]
    fn text_prompt_wraps_source() {
        let config = GenerationConfig::default();
        let p = text_user_prompt("Photosynthesis is...", &config);
        assert!(p.contains("---\nPhotosynthesis is...\n---"));
        assert!(p.ends_with("Output everything in English.\n"));
    }

    #[test]
    fn image_prompt_mentions_images_and_language() {
        let config = GenerationConfig::builder()
            .language(Language::Urdu)
            .build()
            .unwrap();
        let p = image_user_prompt(&config);
        assert!(p.contains("provided image(s)"));
        assert!(p.contains("Output everything in Urdu."));
    }
}
