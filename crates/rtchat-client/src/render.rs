//! Tool cards: a display model per tool event.
//!
//! Rendering is pure and total. Missing or null fields turn into
//! [`PLACEHOLDER`], missing collections into empty row lists that display as
//! [`NO_DATA`], and anything unrecognised falls back to pretty-printed JSON.

use std::fmt;

use serde_json::Value;

use crate::event::ToolEvent;
use crate::registry::ToolRegistry;

pub const MARKET_OVERVIEW_TOOL: &str = "full_market_picture";
pub const ORDERBOOK_TOOL: &str = "orderbook";
pub const TRADES_TOOL: &str = "trades";

pub const PLACEHOLDER: &str = "-";
pub const NO_DATA: &str = "No data";
pub const TRIMMED_MARKER: &str = "\n…trimmed…";

pub const MAX_BOOK_ROWS: usize = 5;
pub const MAX_TRADE_ROWS: usize = 10;
pub const MAX_FALLBACK_CHARS: usize = 2000;

#[derive(Clone, Debug, PartialEq)]
pub struct ToolCard {
    pub tool: String,
    pub function: Option<String>,
    pub body: CardBody,
}

impl ToolCard {
    /// `tool` or `tool · function`.
    pub fn header(&self) -> String {
        match &self.function {
            Some(function) => format!("{} · {}", self.tool, function),
            None => self.tool.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum CardBody {
    MarketOverview(MarketOverview),
    OrderBook(OrderBook),
    Trades(Vec<TradeRow>),
    /// Pretty JSON, already trimmed.
    Raw(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct MarketOverview {
    pub mid: String,
    pub funding: String,
    pub open_interest: String,
    pub premium: String,
    pub signal_label: String,
    pub signal_score: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct OrderBook {
    pub bids: Vec<BookRow>,
    pub asks: Vec<BookRow>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BookRow {
    pub price: String,
    pub size: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TradeRow {
    pub time: String,
    pub price: String,
    pub size: String,
}

/// Renders the card for `tool`, or nothing when either side is absent.
pub fn render(tool: Option<&str>, event: Option<&ToolEvent>) -> Option<ToolCard> {
    let tool = tool.filter(|t| !t.is_empty())?;
    let event = event?;
    let body = match tool {
        // The market overview has a single known spelling; no aliases.
        MARKET_OVERVIEW_TOOL => CardBody::MarketOverview(market_overview(&event.response)),
        ORDERBOOK_TOOL => CardBody::OrderBook(order_book(&event.response)),
        TRADES_TOOL => CardBody::Trades(trades(&event.response)),
        _ => CardBody::Raw(fallback(event)),
    };
    Some(ToolCard {
        tool: tool.to_string(),
        function: event.function.clone(),
        body,
    })
}

/// Renders the registry's current selection.
pub fn render_selected(registry: &ToolRegistry) -> Option<ToolCard> {
    render(registry.selected(), registry.selected_event())
}

fn market_overview(response: &Value) -> MarketOverview {
    let snap = response.get("marketSnapshot");
    let signal = response.get("signal");
    let field = |obj: Option<&Value>, key: &str| {
        scalar(obj.and_then(|o| o.get(key))).unwrap_or_else(|| PLACEHOLDER.to_string())
    };
    MarketOverview {
        mid: field(snap, "mid"),
        funding: field(snap, "funding"),
        open_interest: field(snap, "OI"),
        premium: field(snap, "premium"),
        signal_label: field(signal, "label"),
        signal_score: scalar(signal.and_then(|s| s.get("score"))),
    }
}

fn order_book(response: &Value) -> OrderBook {
    let book = if truthy(response.get("bids")) {
        response
    } else if let Some(data) = response.get("data").filter(|d| truthy(Some(*d))) {
        data
    } else {
        response
    };
    OrderBook {
        bids: book_side(book.get("bids")),
        asks: book_side(book.get("asks")),
    }
}

fn book_side(levels: Option<&Value>) -> Vec<BookRow> {
    let Some(levels) = levels.and_then(Value::as_array) else {
        return Vec::new();
    };
    levels.iter().take(MAX_BOOK_ROWS).map(book_row).collect()
}

fn book_row(level: &Value) -> BookRow {
    let (price, size) = match level {
        Value::Array(pair) => (scalar(pair.first()), scalar(pair.get(1))),
        Value::Object(_) => (
            first_present(level, &["px", "price"]),
            first_present(level, &["sz", "size"]),
        ),
        other => (scalar(Some(other)), None),
    };
    BookRow {
        price: price.unwrap_or_else(|| PLACEHOLDER.to_string()),
        size: size.unwrap_or_else(|| PLACEHOLDER.to_string()),
    }
}

fn trades(response: &Value) -> Vec<TradeRow> {
    let list = response
        .as_array()
        .or_else(|| response.get("data").and_then(Value::as_array));
    let Some(list) = list else {
        return Vec::new();
    };
    let skip = list.len().saturating_sub(MAX_TRADE_ROWS);
    list.iter()
        .skip(skip)
        .map(|trade| TradeRow {
            time: first_present(trade, &["time", "t"]).unwrap_or_else(|| PLACEHOLDER.to_string()),
            price: first_present(trade, &["px", "price"])
                .unwrap_or_else(|| PLACEHOLDER.to_string()),
            size: first_present(trade, &["sz", "size"]).unwrap_or_else(|| PLACEHOLDER.to_string()),
        })
        .collect()
}

fn fallback(event: &ToolEvent) -> String {
    let value = if event.response.is_null() {
        &event.raw
    } else {
        &event.response
    };
    let body = serde_json::to_string_pretty(value).unwrap_or_default();
    trim_chars(body, MAX_FALLBACK_CHARS)
}

fn trim_chars(body: String, max: usize) -> String {
    match body.char_indices().nth(max) {
        Some((cut, _)) => {
            let mut trimmed = body[..cut].to_string();
            trimmed.push_str(TRIMMED_MARKER);
            trimmed
        }
        None => body,
    }
}

/// First key whose value is present and non-empty.
fn first_present(obj: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| scalar(obj.get(*key)))
        .find(|s| !s.is_empty())
}

fn scalar(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(_) => true,
    }
}

impl fmt::Display for ToolCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[{}]", self.header())?;
        match &self.body {
            CardBody::MarketOverview(m) => {
                writeln!(f, "Mid      {}", m.mid)?;
                writeln!(f, "Funding  {}", m.funding)?;
                writeln!(f, "OI       {}", m.open_interest)?;
                writeln!(f, "Premium  {}", m.premium)?;
                match &m.signal_score {
                    Some(score) => writeln!(f, "Signal   {} ({})", m.signal_label, score),
                    None => writeln!(f, "Signal   {}", m.signal_label),
                }
            }
            CardBody::OrderBook(book) => {
                write_side(f, "Bids", &book.bids)?;
                write_side(f, "Asks", &book.asks)
            }
            CardBody::Trades(rows) if rows.is_empty() => writeln!(f, "{NO_DATA}"),
            CardBody::Trades(rows) => {
                for row in rows {
                    writeln!(f, "{}  {}  {}", row.time, row.price, row.size)?;
                }
                Ok(())
            }
            CardBody::Raw(body) => writeln!(f, "{body}"),
        }
    }
}

fn write_side(f: &mut fmt::Formatter<'_>, title: &str, rows: &[BookRow]) -> fmt::Result {
    writeln!(f, "{title}")?;
    if rows.is_empty() {
        return writeln!(f, "  {NO_DATA}");
    }
    for row in rows {
        writeln!(f, "  {}  {}", row.price, row.size)?;
    }
    Ok(())
}
