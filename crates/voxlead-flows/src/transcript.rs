//! Reading rendered `speaker: text` transcripts back into utterances.

use voxlead_types::{Speaker, Utterance};

fn speaker_prefix(line: &str) -> Option<(Speaker, &str)> {
    let (label, rest) = line.split_once(':')?;
    let speaker = match label.trim().to_ascii_lowercase().as_str() {
        "caller" | "user" => Speaker::Caller,
        "assistant" | "agent" => Speaker::Assistant,
        _ => return None,
    };
    Some((speaker, rest.trim()))
}

/// Lines without a speaker label continue the previous utterance; leading
/// unlabeled text is attributed to the caller.
pub fn parse_transcript(text: &str) -> Vec<Utterance> {
    let mut utterances: Vec<Utterance> = Vec::new();
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match (speaker_prefix(line), utterances.last_mut()) {
            (Some((speaker, rest)), _) => utterances.push(Utterance {
                speaker,
                text: rest.to_string(),
            }),
            (None, Some(last)) => {
                if !last.text.is_empty() {
                    last.text.push(' ');
                }
                last.text.push_str(line);
            }
            (None, None) => utterances.push(Utterance::caller(line)),
        }
    }
    utterances
}

/// The utterances of `full` that come after `stored`, when `full` extends
/// it. `None` when the two disagree.
pub fn transcript_tail(stored: &[Utterance], full: &[Utterance]) -> Option<Vec<Utterance>> {
    if full.len() < stored.len() {
        return None;
    }
    let extends = stored
        .iter()
        .zip(full)
        .all(|(a, b)| a.speaker == b.speaker && a.text.trim() == b.text.trim());
    extends.then(|| full[stored.len()..].to_vec())
}
