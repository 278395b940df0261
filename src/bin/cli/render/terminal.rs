use dutchcards_lib::cards::CardOut;

/// ANSI color codes
#[allow(dead_code)]
pub struct Color;

#[allow(dead_code)]
impl Color {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";
    pub const GREEN: &str = "\x1b[32m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GRAY: &str = "\x1b[90m";
}

fn paint(text: &str, color: &str, use_color: bool) -> String {
    if use_color {
        format!("{}{}{}", color, text, Color::RESET)
    } else {
        text.to_string()
    }
}

/// Cut `text` to `width` characters, marking the cut with "..."
pub fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let keep = width.saturating_sub(3);
    format!("{}...", text.chars().take(keep).collect::<String>())
}

/// Render one card as a labelled block
pub fn render_card(card: &CardOut, use_color: bool) -> String {
    let mut lines = Vec::new();

    let title = card.word.as_deref().unwrap_or("(no word)");
    let mut header = format!("#{} {}", card.id, paint(title, Color::BOLD, use_color));
    if let Some(pos) = &card.pos {
        header.push_str(&format!(" {}", paint(&format!("({})", pos), Color::DIM, use_color)));
    }
    lines.push(header);

    let fields: [(&str, Option<String>); 8] = [
        ("rank", card.rank.clone()),
        ("definition", card.definition.clone()),
        ("dutch", card.dutch.clone()),
        ("english", card.english.clone()),
        ("ru", card.ru.clone()),
        ("ukr", card.ukr.clone()),
        ("freq", card.freq.map(|f| f.to_string())),
        ("audio", card.audio_url.clone()),
    ];
    for (label, value) in fields {
        if let Some(value) = value {
            lines.push(format!("  {:<10} {}", paint(label, Color::CYAN, use_color), value));
        }
    }

    lines.join("\n")
}

/// Render cards as a compact table
pub fn render_card_table(cards: &[CardOut], use_color: bool) -> String {
    let id_w = cards
        .iter()
        .map(|c| c.id.to_string().len())
        .max()
        .unwrap_or(2)
        .max(2);
    let word_w = 24;
    let text_w = 30;

    let mut lines = Vec::new();
    let header = format!(
        "{:<id_w$} {:<word_w$} {:<text_w$} {}",
        "Id", "Word", "Dutch", "English",
        id_w = id_w, word_w = word_w, text_w = text_w
    );
    lines.push(paint(&header, Color::BOLD, use_color));
    lines.push(format!(
        "{} {} {} {}",
        "\u{2500}".repeat(id_w),
        "\u{2500}".repeat(word_w),
        "\u{2500}".repeat(text_w),
        "\u{2500}".repeat(text_w)
    ));

    for card in cards {
        lines.push(format!(
            "{:<id_w$} {:<word_w$} {:<text_w$} {}",
            card.id,
            truncate(card.word.as_deref().unwrap_or(""), word_w),
            truncate(card.dutch.as_deref().unwrap_or(""), text_w),
            truncate(card.english.as_deref().unwrap_or(""), text_w),
            id_w = id_w, word_w = word_w, text_w = text_w
        ));
    }

    lines.join("\n")
}
