//! Style constants and clap help styling.

use anstyle::{AnsiColor, Color, Effects, Style};

/// Green: generated file confirmations.
pub(crate) const SUCCESS: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Green)));

/// Red: generation failures.
pub(crate) const ERROR: Style = Style::new().fg_color(Some(Color::Ansi(AnsiColor::Red)));

/// Bold: category headers in the summary.
pub(crate) const HEADER: Style = Style::new().effects(Effects::BOLD);

/// Dimmed: empty categories.
pub(crate) const DIM: Style = Style::new().effects(Effects::DIMMED);

/// Help output palette matching the messages above.
pub(crate) fn clap_styles() -> clap::builder::Styles {
    let heading = Style::new()
        .fg_color(Some(Color::Ansi(AnsiColor::Green)))
        .effects(Effects::BOLD);

    clap::builder::Styles::styled()
        .header(heading)
        .usage(heading)
        .literal(Style::new().fg_color(Some(Color::Ansi(AnsiColor::Cyan))))
        .placeholder(Style::new().fg_color(Some(Color::Ansi(AnsiColor::Cyan))))
        .error(
            Style::new()
                .fg_color(Some(Color::Ansi(AnsiColor::Red)))
                .effects(Effects::BOLD),
        )
}
