// ABOUTME: Utility functions for shaping agent output into chat messages.
// ABOUTME: Splits long text under the platform limit and formats system notices.

use agentcord_agent::SystemLevel;

/// Chunk a message into pieces of at most `max_chars` characters.
///
/// Lines are packed together while they fit; chunk boundaries fall on line
/// breaks, which are dropped at the boundary. A single line longer than the
/// limit is split at character boundaries. Empty text yields no chunks.
pub fn chunk_message(text: &str, max_chars: usize) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    let max_chars = max_chars.max(1);
    if text.chars().count() <= max_chars {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    // (text, length in chars); None until the first line lands in a chunk
    let mut current: Option<(String, usize)> = None;

    for line in text.split('\n') {
        let line_len = line.chars().count();

        if let Some((chunk, len)) = current.as_mut() {
            if *len + 1 + line_len <= max_chars {
                chunk.push('\n');
                chunk.push_str(line);
                *len += 1 + line_len;
                continue;
            }
        }
        if let Some((chunk, _)) = current.take() {
            chunks.push(chunk);
        }

        if line_len <= max_chars {
            current = Some((line.to_string(), line_len));
            continue;
        }

        let chars: Vec<char> = line.chars().collect();
        let mut pieces = chars.chunks(max_chars).peekable();
        while let Some(piece) = pieces.next() {
            let piece: String = piece.iter().collect();
            if pieces.peek().is_some() {
                chunks.push(piece);
            } else {
                // the tail may still share a chunk with the following lines
                let len = piece.chars().count();
                current = Some((piece, len));
            }
        }
    }

    if let Some((chunk, _)) = current {
        chunks.push(chunk);
    }
    chunks
}

/// Render a system notice as `[LEVEL]: message`
pub fn format_system_output(level: SystemLevel, message: &str) -> String {
    format!("[{}]: {}", level.as_str().to_uppercase(), message)
}
