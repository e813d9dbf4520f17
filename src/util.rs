use std::time::Instant;

/// Print the time elapsed since `start` as hours, minutes and seconds.
pub fn print_hms(start: &Instant) {
    println!("Elapsed: {}", format_hms(start.elapsed().as_secs()));
}

pub fn format_hms(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

/// Clip `text` to `width` characters for table output.
pub fn clip(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut clipped: String = text.chars().take(width.saturating_sub(1)).collect();
    clipped.push('…');
    clipped
}
