//! Dashboard rendering.
//!
//! Text for each line is built by small pure functions so it can be tested
//! without a terminal; [`draw`] only lays the lines out and colors them.

use std::fmt::Display;

use chrono::{DateTime, Local, TimeZone};
use cliplink_core::clipboard::preview;
use ratatui::layout::{Constraint, Layout};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{List, ListItem, Paragraph};
use ratatui::Frame;

use super::state::{AppState, ClipOrigin, HistoryEntry, PeerEntry};
use super::theme::Theme;

/// Characters of clip content shown per history line.
const CONTENT_PREVIEW_LEN: usize = 35;

/// Peer names listed before collapsing into "+k more".
const MAX_LISTED_PEERS: usize = 3;

const DIVIDER_WIDTH: usize = 50;

/// Dashboard title.
pub fn title_text() -> String {
    format!("CLIPLINK [v{}]", env!("CARGO_PKG_VERSION"))
}

/// Connection status line.
pub fn status_text(peers: &[PeerEntry]) -> String {
    if peers.is_empty() {
        "[○] SEARCHING...".to_string()
    } else {
        format!(
            "[●] CONNECTED ({} Peers: {})",
            peers.len(),
            peer_names(peers)
        )
    }
}

fn peer_names(peers: &[PeerEntry]) -> String {
    let listed: Vec<&str> = peers
        .iter()
        .take(MAX_LISTED_PEERS)
        .map(|p| p.name.as_str())
        .collect();
    let mut names = listed.join(", ");
    if peers.len() > MAX_LISTED_PEERS {
        names.push_str(&format!(" +{} more", peers.len() - MAX_LISTED_PEERS));
    }
    names
}

/// Format a timestamp as `h:mm AM`.
pub fn format_time<Tz: TimeZone>(timestamp: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    timestamp.format("%-I:%M %p").to_string()
}

/// History tag for an entry.
pub const fn origin_tag(origin: ClipOrigin) -> &'static str {
    match origin {
        ClipOrigin::Local => "[Local]",
        ClipOrigin::Remote => "[Remote]",
    }
}

const fn sync_label(sync_enabled: bool) -> &'static str {
    if sync_enabled {
        "ON"
    } else {
        "OFF"
    }
}

/// Draw the whole dashboard.
pub fn draw(frame: &mut Frame, state: &AppState, theme: &Theme) {
    let [title, top_divider, status, _, heading, history, bottom_divider, footer] =
        Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .areas(frame.area());

    let divider = Line::styled("─".repeat(DIVIDER_WIDTH), Style::default().fg(theme.text_muted));
    let bold = Style::default().add_modifier(Modifier::BOLD);

    frame.render_widget(
        Paragraph::new(Line::styled(title_text(), bold.fg(theme.accent))),
        title,
    );
    frame.render_widget(Paragraph::new(divider.clone()), top_divider);

    let status_color = if state.peers.is_empty() {
        theme.error
    } else {
        theme.success
    };
    frame.render_widget(
        Paragraph::new(Line::styled(status_text(&state.peers), bold.fg(status_color))),
        status,
    );

    frame.render_widget(
        Paragraph::new(Line::styled("HISTORY:", Style::default().fg(theme.text_primary))),
        heading,
    );

    if state.history.is_empty() {
        frame.render_widget(
            Paragraph::new(Line::styled(
                "  No sync history yet...",
                Style::default().fg(theme.text_muted),
            )),
            history,
        );
    } else {
        let visible = usize::from(history.height);
        let skip = state.history.len().saturating_sub(visible);
        let items: Vec<ListItem> = state
            .history
            .iter()
            .skip(skip)
            .map(|entry| ListItem::new(history_line(entry, theme)))
            .collect();
        frame.render_widget(List::new(items), history);
    }

    frame.render_widget(Paragraph::new(divider), bottom_divider);
    frame.render_widget(Paragraph::new(footer_line(state.sync_enabled, theme)), footer);
}

fn history_line<'a>(entry: &HistoryEntry, theme: &Theme) -> Line<'a> {
    let tag_color = match entry.origin {
        ClipOrigin::Local => theme.local_tag,
        ClipOrigin::Remote => theme.remote_tag,
    };

    Line::from(vec![
        Span::raw("  "),
        Span::styled(
            format_time(&entry.timestamp.with_timezone(&Local)),
            Style::default().fg(theme.text_muted),
        ),
        Span::raw("  "),
        Span::styled(
            origin_tag(entry.origin),
            Style::default().fg(tag_color).add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(
            preview(&entry.content, CONTENT_PREVIEW_LEN),
            Style::default().fg(theme.text_primary),
        ),
    ])
}

fn footer_line<'a>(sync_enabled: bool, theme: &Theme) -> Line<'a> {
    let key = Style::default()
        .fg(theme.accent)
        .add_modifier(Modifier::BOLD);
    let muted = Style::default().fg(theme.text_muted);
    let sync_color = if sync_enabled {
        theme.success
    } else {
        theme.error
    };

    Line::from(vec![
        Span::styled("(q)", key),
        Span::styled(" Quit  ", muted),
        Span::styled("(s)", key),
        Span::styled(" Toggle Sync ", muted),
        Span::styled(
            format!("[{}]", sync_label(sync_enabled)),
            Style::default().fg(sync_color).add_modifier(Modifier::BOLD),
        ),
        Span::styled("  ", muted),
        Span::styled("(c)", key),
        Span::styled(" Clear History", muted),
    ])
}
