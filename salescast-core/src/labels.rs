//! Axis labels, one per timeline key (`19 окт.`, `Oct 19`).

use chrono::Datelike;
use serde::{Deserialize, Serialize};

use crate::date_key::DateKey;

const RU_MONTHS: [&str; 12] = [
    "янв.", "февр.", "мар.", "апр.", "мая", "июн.", "июл.", "авг.", "сент.", "окт.", "нояб.", "дек.",
];

const EN_MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelLocale {
    #[default]
    Ru,
    En,
}

impl LabelLocale {
    /// Abbreviated month plus day. Russian pads the day to two digits,
    /// English does not (`01 мая`, `May 1`).
    pub fn axis_label(self, key: DateKey) -> String {
        let date = key.date();
        let month = date.month0() as usize;
        match self {
            LabelLocale::Ru => format!("{:02} {}", date.day(), RU_MONTHS[month]),
            LabelLocale::En => format!("{} {}", EN_MONTHS[month], date.day()),
        }
    }

    pub fn axis_labels(self, keys: &[DateKey]) -> Vec<String> {
        keys.iter().map(|key| self.axis_label(*key)).collect()
    }
}
