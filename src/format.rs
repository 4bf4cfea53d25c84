use crate::capabilities::ValidationResult;

/// Attribution appended to direct text replies
pub const SIGNATURE: &str = "_Questo bot è stato programmato da blackdagger_";

const VOIP_WARNING: &str = " ⚠️";

/// Append the signature after a blank line
pub fn sign(text: &str) -> String {
    format!("{}\n\n{}", text, SIGNATURE)
}

/// First character uppercase, the rest lowercase
pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Signed contact report for the phone auto-check
pub fn phone_report(result: &ValidationResult) -> String {
    let warning = if result.is_voip() { VOIP_WARNING } else { "" };
    sign(&format!(
        "🔍 Analisi contatto\n\
         📍 Paese: {}\n\
         📞 Operatore: {}\n\
         📡 Linea: {}{}",
        result.country,
        result.carrier,
        capitalize(&result.line_type),
        warning
    ))
}
