//! Prompts sent to the generative model.
//!
//! Every request carries two parts: the document (inline file data or the
//! pasted text behind [`TEXT_LEAD_IN`]) followed by [`FORMATTING_RULES`].
//! Keeping the wording here means unit tests can inspect it directly and a
//! rule change touches exactly one place.
//!
//! Callers can replace the rules via [`crate::config::ConversionConfig::system_prompt`].

/// Sentence placed in front of pasted text so the model knows what follows
/// is content to process, not instructions.
pub const TEXT_LEAD_IN: &str = "Below is the text content to be processed:\n";

/// Fixed formatting rules for converting a document into Word-ready HTML.
pub const FORMATTING_RULES: &str = r#"
You are an expert document converter and a professional typesetter of Mathematics, Physics and Chemistry material.
Task: transcribe the input content into clean, standard HTML that can be pasted straight into Microsoft Word.

FOLLOW ALL OF THE RULES BELOW (NONE MAY BE SKIPPED):

1. **Spelling & Unicode**:
   - Review and automatically fix Vietnamese spelling mistakes.
   - Repair Unicode characters broken by bad font encodings.

2. **Mathematics & Science (IMPORTANT)**:
   - Keep the original content but repair broken formulas, and always wrap them in a pair of $...$ (LaTeX).
   - **PAY SPECIAL ATTENTION:** a formula inside a line of text must flow with that text; **NEVER** break the line before or after the formula. Use only $...$ (inline math), **NOT** $$...$$ (block math), unless the formula stands alone on its own line.
   - Greek letters in physics formulas:
     ρ → \rho, θ → \theta, α → \alpha, β → \beta, Δ → \Delta, μ → \mu, λ → \lambda...
   - Symbols: ◦C becomes ^\circ C (e.g. $300^\circ C$, $-23^\circ C$). % becomes \%.
   - Units: add a thin space (\;) between a number and its unit, e.g. $50\;cm$, $100\;g$.
   - Fix number/coordinate formatting:
     e.g. ($-2;0;0$) becomes $(-2;0;0)$.
     e.g. *Oxy* becomes $Oxy$.

3. **Structure & Layout**:
   - **REMOVE ENTIRELY** tick-box tables of the form (|Statement|True|False|) and the stray (a), (b)... markers inside them.
   - Replace such a table with a line-by-line list formatted as: a) Content... or A. Content...
   - Drop stray "*" around words (e.g. *Question 1* -> <b>Question 1</b> or just Question 1, never leave the asterisks).
   - [LINE BREAK] the data sensibly. Remove empty lines that carry no data.
   - Use <p> tags for paragraphs and <br> for line breaks. Do not use the \n character.

4. **Principles**:
   - Do not add to or remove from the original content (except removing the redundant True/False tables).
   - Return only the processed content as HTML (p, b, i, br... tags). Do NOT return Markdown (```).
"#;

/// Wrap pasted text with the lead-in sentence.
pub fn wrap_pasted_text(text: &str) -> String {
    format!("{TEXT_LEAD_IN}{text}")
}
