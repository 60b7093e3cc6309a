use serenity::all::{CommandDataOptionValue, CommandInteraction};

pub mod chart;
pub mod earnings;

pub(crate) fn get_str_opt<'a>(command: &'a CommandInteraction, name: &str) -> Option<&'a str> {
    command
        .data
        .options
        .iter()
        .find(|o| o.name == name)
        .and_then(|o| match &o.value {
            CommandDataOptionValue::String(s) => Some(s.as_str()),
            _ => None,
        })
}

/// Humanized magnitude: 3.4e12 → "3.40T".
pub fn human_amount(n: Option<f64>) -> String {
    let Some(mut n) = n.filter(|v| v.is_finite()) else {
        return "N/A".to_string();
    };
    for unit in ["", "K", "M", "B", "T"] {
        if n.abs() < 1000.0 {
            return format!("{n:.2}{unit}");
        }
        n /= 1000.0;
    }
    format!("{n:.2}Q")
}

pub fn ratio_or_na(v: Option<f64>) -> String {
    v.filter(|x| x.is_finite())
        .map(|x| format!("{x:.2}"))
        .unwrap_or_else(|| "N/A".to_string())
}
