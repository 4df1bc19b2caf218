use nu_ansi_term::{Color, Style};
use sombra_pattern::{query::Parameters, PropertyValue};
use std::fmt::Display;
use std::io::IsTerminal;

const CLAUSE_KEYWORDS: &[&str] = &["WHERE ", "RETURN ", "ORDER BY ", "LIMIT "];

#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum Theme {
    Auto,
    Light,
    Dark,
    Plain,
}

pub struct Ui {
    palette: Palette,
    paint: bool,
}

impl Ui {
    pub fn new(theme: Theme) -> Self {
        let stdout_is_tty = std::io::stdout().is_terminal();
        let paint = match theme {
            Theme::Plain => false,
            Theme::Auto | Theme::Light | Theme::Dark => stdout_is_tty,
        };

        #[cfg(windows)]
        if paint {
            let _ = nu_ansi_term::enable_ansi_support();
        }

        let palette = match theme {
            Theme::Plain => Palette::plain(),
            Theme::Light => Palette::light(),
            Theme::Dark | Theme::Auto => Palette::dark(),
        };

        Self { palette, paint }
    }

    pub fn spacer(&self) {
        println!();
    }

    pub fn section<'a, I, V>(&self, title: &str, rows: I)
    where
        I: IntoIterator<Item = (&'a str, V)>,
        V: Display,
    {
        let rows: Vec<(String, String)> = rows
            .into_iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();

        if rows.is_empty() {
            return;
        }

        self.heading(title);
        let key_width = rows.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
        for (key, value) in rows {
            if self.paint {
                println!(
                    "  {} {}",
                    self.palette.key.paint(format!("{key:>key_width$}:")),
                    self.palette.value.paint(value)
                );
            } else {
                println!("  {key:>key_width$}: {value}");
            }
        }
    }

    pub fn list<I>(&self, title: &str, entries: I)
    where
        I: IntoIterator<Item = String>,
    {
        let entries: Vec<String> = entries.into_iter().collect();
        if entries.is_empty() {
            return;
        }
        self.heading(title);
        for entry in entries {
            if self.paint {
                println!("  {} {entry}", self.palette.bullet.paint("•"));
            } else {
                println!("  - {entry}");
            }
        }
    }

    /// Prints a statement one clause per line, keywords highlighted.
    pub fn statement(&self, statement: &str) {
        for clause in statement_clauses(statement) {
            if !self.paint {
                println!("  {clause}");
                continue;
            }
            let keyword_len = clause_keyword(clause).map_or(0, str::len);
            let (keyword, rest) = clause.split_at(keyword_len);
            println!(
                "  {}{}",
                self.palette.keyword.paint(keyword),
                self.palette.value.paint(rest)
            );
        }
    }

    /// Prints parameter bindings, with nulls flagged as unbound.
    pub fn parameters(&self, parameters: &Parameters) {
        if parameters.is_empty() {
            return;
        }
        self.heading("parameters");
        let key_width = parameters.keys().map(String::len).max().unwrap_or(0);
        for (name, value) in parameters {
            let style = match value {
                PropertyValue::Null => self.palette.warn,
                PropertyValue::String(_) => self.palette.value,
                _ => self.palette.literal,
            };
            let shown = match value {
                PropertyValue::Null => "null (unbound)".to_owned(),
                other => other.to_string(),
            };
            if self.paint {
                println!(
                    "  {} {}",
                    self.palette.key.paint(format!("{name:>key_width$}:")),
                    style.paint(shown)
                );
            } else {
                println!("  {name:>key_width$}: {shown}");
            }
        }
    }

    pub fn info(&self, message: &str) {
        let prefix = if self.paint {
            self.palette.info.paint(INFO_ICON)
        } else {
            Style::new().paint(INFO_ICON)
        };
        println!("{prefix} {message}");
    }

    pub fn warn(&self, message: &str) {
        let prefix = if self.paint {
            self.palette.warn.paint(WARNING_ICON)
        } else {
            Style::new().paint(WARNING_ICON)
        };
        eprintln!("{prefix} {message}");
    }

    pub fn heading(&self, title: &str) {
        let formatted = format!("{HEADING_ICON} {title}");
        if self.paint {
            println!("{}", self.palette.heading.paint(formatted));
        } else {
            println!("{formatted}");
        }
    }
}

/// Splits a rendered statement before each top-level clause keyword.
fn statement_clauses(statement: &str) -> Vec<&str> {
    let mut clauses = Vec::new();
    let mut start = 0;
    let mut depth = 0usize;
    let mut quoted: Option<char> = None;
    for (idx, ch) in statement.char_indices() {
        match (quoted, ch) {
            (Some(q), c) if c == q => quoted = None,
            (Some(_), _) => {}
            (None, '\'' | '"' | '`') => quoted = Some(ch),
            (None, '(' | '{' | '[') => depth += 1,
            (None, ')' | '}' | ']') => depth = depth.saturating_sub(1),
            (None, ' ') if depth == 0 => {
                let rest = &statement[idx + 1..];
                if clause_keyword(rest).is_some() {
                    clauses.push(&statement[start..idx]);
                    start = idx + 1;
                }
            }
            _ => {}
        }
    }
    clauses.push(&statement[start..]);
    clauses
}

fn clause_keyword(clause: &str) -> Option<&'static str> {
    if clause.starts_with("MATCH ") {
        return Some("MATCH ");
    }
    CLAUSE_KEYWORDS
        .iter()
        .copied()
        .find(|keyword| clause.starts_with(keyword))
}

struct Palette {
    heading: Style,
    key: Style,
    keyword: Style,
    value: Style,
    literal: Style,
    bullet: Style,
    info: Style,
    warn: Style,
}

impl Palette {
    fn dark() -> Self {
        Self {
            heading: Style::new().fg(Color::Purple).bold(),
            key: Style::new().fg(Color::LightBlue).bold(),
            keyword: Style::new().fg(Color::LightPurple).bold(),
            value: Style::new().fg(Color::White),
            literal: Style::new().fg(Color::LightGreen),
            bullet: Style::new().fg(Color::LightBlue),
            info: Style::new().fg(Color::LightCyan),
            warn: Style::new().fg(Color::Yellow).bold(),
        }
    }

    fn light() -> Self {
        Self {
            heading: Style::new().fg(Color::Blue).bold(),
            key: Style::new().fg(Color::Black).bold(),
            keyword: Style::new().fg(Color::Purple).bold(),
            value: Style::new().fg(Color::Black),
            literal: Style::new().fg(Color::Green),
            bullet: Style::new().fg(Color::Blue),
            info: Style::new().fg(Color::Purple),
            warn: Style::new().fg(Color::Red).bold(),
        }
    }

    fn plain() -> Self {
        Self {
            heading: Style::new(),
            key: Style::new(),
            keyword: Style::new(),
            value: Style::new(),
            literal: Style::new(),
            bullet: Style::new(),
            info: Style::new(),
            warn: Style::new(),
        }
    }
}

const HEADING_ICON: &str = "▸";
const WARNING_ICON: &str = "⚠";
const INFO_ICON: &str = "ℹ";
