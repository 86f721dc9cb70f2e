//! Prompts for every model call in the pipeline.
//!
//! Centralising them here serves two purposes:
//!
//! 1. **Single source of truth** — the report's section names and score
//!    format are promised to the display layer; changing them happens in
//!    exactly one place.
//! 2. **Testability** — unit tests inspect the prompts directly (the
//!    score label, the sub-score allocation) without a live model.
//!
//! The output schema is a *soft contract*: it is enforced by these
//! instructions, then checked after the fact by [`crate::report`]'s
//! parser, which falls back to an unstructured view when the model
//! drifts from the template.

/// System prompt for the per-batch slide analysis calls.
pub const SLIDE_ANALYST_SYSTEM_PROMPT: &str = "\
You are an experienced partner at a venture capital fund reviewing a \
startup pitch deck slide by slide. For each slide image you receive, \
record what the slide claims and what it shows: the problem, the proposed \
solution, market sizing, traction metrics, business model, competition, \
and team. Quote concrete numbers exactly as they appear. Keep the \
observations in slide order and do not editorialise yet — the investment \
judgement comes later, from the full deck.";

/// User instruction accompanying each slide batch.
///
/// Deliberately minimal: the system prompt establishes everything, and
/// the images carry the content. Batches get no batch-specific
/// instructions so their outputs concatenate into one seamless narrative.
pub const BATCH_USER_PROMPT: &str = "\
Here is the next set of slides from the deck, in order. Record your \
observations for each slide.";

/// Score label emitted by the synthesis prompt and matched first by the
/// report parser. Kept as a constant so prompt and parser cannot drift
/// apart silently.
pub const SCORE_LABEL: &str = "Investment Score: [";

/// System prompt for the final synthesis call.
pub const SYNTHESIS_SYSTEM_PROMPT: &str = "\
You are an experienced venture capital partner writing an investment memo \
from pitch-deck observations and, when provided, verified company data. \
Follow the output format exactly.";

/// Build the user message for the final synthesis call.
///
/// The instructions mandate (a) fixed named sections, (b) a single 0–100
/// score with a sub-score allocation that sums to 100, (c) literal
/// `Unknown` for required-but-missing fields instead of omission, and
/// (d) source tags when enrichment data was supplied.
pub fn synthesis_prompt(slide_narrative: &str, enrichment_summary: Option<&str>) -> String {
    let mut prompt = String::with_capacity(slide_narrative.len() + 2048);

    prompt.push_str(
        "Write the investment memo for this pitch deck.\n\n\
         Structure the memo with exactly these sections, each introduced by \
         its title on its own line and separated by blank lines:\n\
         EXECUTIVE SUMMARY\n\
         PROBLEM & SOLUTION\n\
         MARKET & COMPETITION\n\
         BUSINESS MODEL & TRACTION\n\
         TEAM\n\
         RISKS\n\
         FINAL ASSESSMENT\n\n\
         The FINAL ASSESSMENT must end with one line of the exact form\n\
         Investment Score: [NN/100]\n\
         where NN is the sum of four sub-scores you must state explicitly: \
         Team (0-30), Market (0-25), Product (0-25), Traction (0-20).\n\n\
         For any required fact the materials do not establish (founding \
         year, funding raised, revenue, team size), write Unknown rather \
         than omitting or guessing it.\n",
    );

    if enrichment_summary.is_some() {
        prompt.push_str(
            "\nTag every claim with its source: [Deck] for statements from \
             the slides, [Company data] for statements from the verified \
             company profile. Where the two conflict, say so.\n",
        );
    }

    prompt.push_str("\n--- SLIDE OBSERVATIONS (in deck order) ---\n");
    prompt.push_str(slide_narrative);

    if let Some(summary) = enrichment_summary {
        prompt.push_str("\n\n--- VERIFIED COMPANY DATA ---\n");
        prompt.push_str(summary);
    }

    prompt
}

/// System prompt for condensed-profile summarization.
pub const ENRICHMENT_SYSTEM_PROMPT: &str = "\
You are a venture analyst. Summarise the following structured company \
profile into a short factual narrative an investor can read in under a \
minute: what the company does, team size and composition, funding history, \
notable employee backgrounds, and growth signals. State only what the data \
supports; do not speculate.";

/// System prompt for the follow-up chat endpoint.
///
/// The first assistant turn of the history is the full analysis, so the
/// model answers questions against it without any server-side state.
pub const FOLLOW_UP_SYSTEM_PROMPT: &str = "\
You are an expert in pitch-deck analysis and venture capital. You have \
analysed this company's pitch deck — your analysis is the first message of \
this conversation — and you answer follow-up questions about the company \
concisely and precisely. Ground every answer in the analysis or in the \
verified company data it cites; when the materials do not answer the \
question, say so instead of speculating.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthesis_prompt_pins_score_format() {
        let p = synthesis_prompt("obs", None);
        assert!(p.contains("Investment Score: [NN/100]"));
        // Sub-score allocation must sum to 100.
        assert!(p.contains("Team (0-30)"));
        assert!(p.contains("Market (0-25)"));
        assert!(p.contains("Product (0-25)"));
        assert!(p.contains("Traction (0-20)"));
    }

    #[test]
    fn synthesis_prompt_requires_unknown_placeholders() {
        let p = synthesis_prompt("obs", None);
        assert!(p.contains("write Unknown"));
    }

    #[test]
    fn source_tags_only_when_enrichment_present() {
        let without = synthesis_prompt("obs", None);
        let with = synthesis_prompt("obs", Some("profile"));
        assert!(!without.contains("[Company data]"));
        assert!(with.contains("[Company data]"));
        assert!(with.contains("VERIFIED COMPANY DATA"));
        assert!(with.ends_with("profile"));
    }

    #[test]
    fn slide_narrative_is_embedded_verbatim() {
        let p = synthesis_prompt("slide 1 shows churn of 3%", None);
        assert!(p.contains("slide 1 shows churn of 3%"));
    }
}
