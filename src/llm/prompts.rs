/// Transcripts are cut to this many characters before prompting
pub const MAX_TRANSCRIPT_CHARS: usize = 8000;

/// Instruction for the narrative summary call
pub const SUMMARY_PROMPT: &str = r#"You are a financial analyst assistant. Read the following earnings call transcript and summarize it in 5-7 sentences, highlighting:
- Key financial metrics (e.g. EPS, revenue)
- Forward guidance
- Major product or strategy updates
- Sentiment or tone of executives

Transcript:
"#;

/// Instruction for the structured-fields call
pub const STRUCTURE_PROMPT: &str = r#"Extract the following fields from this earnings call transcript and return them as a JSON object:
- eps
- revenue
- guidance
- key_risks
- ceo_quote

Example:
{
  "eps": "2.15",
  "revenue": "123.9B",
  "guidance": "Revenue growth expected in Q2",
  "key_risks": ["foreign exchange volatility", "supply chain issues"],
  "ceo_quote": "We're optimistic about the future and focused on innovation."
}

Transcript:
"#;

const STRUCTURE_SUFFIX: &str = "\n\nOnly return a valid JSON object.";

/// Truncate to at most `max_chars` characters without splitting a code point
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

pub fn build_summary_prompt(transcript: &str) -> String {
    let mut prompt = String::from(SUMMARY_PROMPT);
    prompt.push_str(truncate_chars(transcript, MAX_TRANSCRIPT_CHARS));
    prompt.push('\n');
    prompt
}

pub fn build_structure_prompt(transcript: &str) -> String {
    let mut prompt = String::from(STRUCTURE_PROMPT);
    prompt.push_str(truncate_chars(transcript, MAX_TRANSCRIPT_CHARS));
    prompt.push_str(STRUCTURE_SUFFIX);
    prompt
}
