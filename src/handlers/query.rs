use crate::models::conversation::{ConversationEntry, EntryKind};

pub fn render_entry(entry: &ConversationEntry) -> String {
    let time = entry.timestamp.format("%H:%M:%S");
    match entry.kind {
        EntryKind::Question => format!("[{}] you> {}", time, entry.text),
        EntryKind::Answer => format!("[{}] ai>  {}", time, entry.text),
        EntryKind::Error => format!("[{}] !!   {}", time, entry.text),
    }
}

pub fn render_transcript(transcript: &[ConversationEntry], banner: Option<&str>) -> String {
    let mut lines = Vec::with_capacity(transcript.len() + 1);
    if let Some(banner) = banner {
        lines.push(format!("*** {} ***", banner));
    }
    if transcript.is_empty() {
        lines.push("No questions yet. Ask something about your data.".to_string());
    }
    lines.extend(transcript.iter().map(render_entry));
    lines.join("\n")
}
