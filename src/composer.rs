use crate::attachment::AttachmentSource;
use crate::models::{NotifiableEvent, OutboundMessage};
use rust_decimal::{Decimal, RoundingStrategy};
use std::fmt::Write;
use std::sync::Arc;

const UNKNOWN: &str = "Unknown";

/// Builds Telegram-flavoured HTML messages from notifiable events.
pub struct MessageComposer {
    explorer_url: String,
    attachments: Option<Arc<dyn AttachmentSource>>,
}

impl MessageComposer {
    pub fn new(explorer_url: impl Into<String>) -> Self {
        Self {
            explorer_url: explorer_url.into().trim_end_matches('/').to_string(),
            attachments: None,
        }
    }

    pub fn with_attachments(mut self, attachments: Arc<dyn AttachmentSource>) -> Self {
        self.attachments = Some(attachments);
        self
    }

    /// One message enumerating every event, or `None` when there is nothing
    /// to say. Attachment lookup never fails composition.
    pub fn compose(&self, events: &[NotifiableEvent]) -> Option<OutboundMessage> {
        if events.is_empty() {
            return None;
        }

        let mut text = String::from("<b>New token activity</b>\n");
        for event in events {
            text.push('\n');
            self.render_event(&mut text, event);
        }

        Some(OutboundMessage {
            text: text.trim_end().to_string(),
            attachment_path: self.attachments.as_ref().and_then(|a| a.pick()),
        })
    }

    fn render_event(&self, out: &mut String, event: &NotifiableEvent) {
        let metadata = &event.metadata;
        let name = metadata.name.as_deref().unwrap_or(UNKNOWN);
        let symbol = metadata.symbol.as_deref().unwrap_or(UNKNOWN);

        let _ = writeln!(
            out,
            "🪙 <b>{}</b> ({})",
            escape_html(name),
            escape_html(symbol)
        );
        if let Some(market_cap) = metadata.market_cap_fd {
            let _ = writeln!(out, "Market cap: {}", format_usd(market_cap));
        }
        if let Some(price) = metadata.price_usd {
            let _ = writeln!(out, "Price: ${}", price.normalize());
        }
        let _ = writeln!(
            out,
            "<a href=\"{}\">Token</a> | <a href=\"{}\">Wallet</a>",
            self.token_link(&event.transfer.token_address),
            self.account_link(&event.transfer.owner_address),
        );
    }

    pub fn token_link(&self, token_address: &str) -> String {
        format!(
            "{}/token/{}",
            self.explorer_url,
            urlencoding::encode(token_address)
        )
    }

    pub fn account_link(&self, address: &str) -> String {
        format!(
            "{}/account/{}",
            self.explorer_url,
            urlencoding::encode(address)
        )
    }
}

/// Formats a dollar amount with thousands separators and two decimals,
/// e.g. `$1,234,567.89`.
pub fn format_usd(amount: Decimal) -> String {
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    let digits = rounded.abs().to_string();
    let (whole, fraction) = digits.split_once('.').unwrap_or((digits.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, c) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    format!("{sign}${grouped}.{fraction}")
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
