//! Line-based rendering of flow forms on a terminal

use inworld_tts_core::flow::{FieldKind, FormField, StepId};
use inworld_tts_core::Form;
use serde_json::{Map, Value};
use std::io::Write;
use tokio::io::{AsyncBufRead, Lines};

/// Human text for a form error code
pub fn describe(code: &str) -> &str {
    match code {
        "invalid_auth" => "Invalid API key",
        "cannot_connect" => "Cannot reach the Inworld API",
        "unknown" => "Unexpected error, see the log for details",
        "required" => "This field is required",
        "invalid_choice" => "Not one of the offered choices",
        "invalid_number" => "Not a number",
        "out_of_range" => "Value out of range",
        "invalid_url" => "Must be an http(s) URL",
        other => other,
    }
}

fn display_default(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn print_header(form: &Form) {
    println!();
    match form.step_id {
        StepId::Credentials => println!("== Inworld API credentials =="),
        StepId::VoiceSelection => {
            let language = form
                .description_placeholders
                .get("selected_language")
                .map(String::as_str)
                .unwrap_or_default();
            println!("== Voice selection (language: {language}) ==");
        }
    }
    if let Some(code) = form.base_error() {
        println!("! {}", describe(code));
    }
}

fn print_field(field: &FormField, form: &Form) {
    if let Some(code) = form.error(field.name) {
        println!("  ! {}: {}", field.name, describe(code));
    }
    if let FieldKind::Select { options } = &field.kind {
        for (i, opt) in options.iter().enumerate() {
            println!("    [{}] {} - {}", i + 1, opt.value, opt.label);
        }
    }
}

fn prompt_text(field: &FormField, fallback_key: Option<&str>) -> String {
    let mut prompt = field.name.to_string();
    match &field.kind {
        FieldKind::Integer { min, max } => prompt.push_str(&format!(" ({min}-{max})")),
        FieldKind::Float { min, max } => prompt.push_str(&format!(" ({min}-{max})")),
        FieldKind::Secret if fallback_key.is_some() => prompt.push_str(" [configured key]"),
        _ => {}
    }
    if let Some(default) = field.default.as_ref().filter(|d| !d.is_null()) {
        let shown = display_default(default);
        if !shown.is_empty() {
            prompt.push_str(&format!(" [{shown}]"));
        }
    }
    prompt.push_str(": ");
    prompt
}

/// Answer for one field from a raw input line; `None` leaves it unsubmitted
fn answer(field: &FormField, line: &str, fallback_key: Option<&str>) -> Option<Value> {
    let line = line.trim();
    if line.is_empty() {
        return match field.kind {
            FieldKind::Secret => fallback_key.map(|k| Value::String(k.to_string())),
            _ => field.default.clone().filter(|d| !d.is_null()),
        };
    }
    if let FieldKind::Select { options } = &field.kind {
        // Accept a 1-based index as well as the value itself
        if let Some(opt) = line
            .parse::<usize>()
            .ok()
            .and_then(|i| i.checked_sub(1))
            .and_then(|i| options.get(i))
        {
            return Some(Value::String(opt.value.clone()));
        }
    }
    Some(Value::String(line.to_string()))
}

/// Ask for every field of `form`. Returns `None` when input ends.
pub async fn fill_form<R>(
    form: &Form,
    lines: &mut Lines<R>,
    fallback_key: Option<&str>,
) -> std::io::Result<Option<Map<String, Value>>>
where
    R: AsyncBufRead + Unpin,
{
    print_header(form);
    let mut input = Map::new();
    for field in &form.fields {
        print_field(field, form);
        print!("{}", prompt_text(field, fallback_key));
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            return Ok(None);
        };
        if let Some(value) = answer(field, &line, fallback_key) {
            input.insert(field.name.to_string(), value);
        }
    }
    Ok(Some(input))
}

#[cfg(test)]
mod tests {
    use super::*;
    use inworld_tts_core::flow::SelectOption;
    use serde_json::json;

    fn select() -> FormField {
        FormField {
            name: "voice_id",
            required: true,
            default: Some(json!("v1")),
            kind: FieldKind::Select {
                options: vec![
                    SelectOption {
                        value: "v1".into(),
                        label: "Voice One".into(),
                    },
                    SelectOption {
                        value: "v2".into(),
                        label: "Voice Two".into(),
                    },
                ],
            },
        }
    }

    #[test]
    fn empty_line_takes_default() {
        assert_eq!(answer(&select(), "  ", None), Some(json!("v1")));
    }

    #[test]
    fn index_selects_option() {
        assert_eq!(answer(&select(), "2", None), Some(json!("v2")));
        assert_eq!(answer(&select(), "9", None), Some(json!("9")));
    }

    #[test]
    fn secret_falls_back_to_configured_key() {
        let field = FormField {
            name: "api_key",
            required: true,
            default: None,
            kind: FieldKind::Secret,
        };
        assert_eq!(answer(&field, "", Some("K")), Some(json!("K")));
        assert_eq!(answer(&field, "", None), None);
        assert!(!prompt_text(&field, Some("K")).contains('K'));
    }
}
