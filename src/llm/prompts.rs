//! Prompt composition for the generation call, plus post-processing of the
//! provider output.

use super::client::ScriptRequest;

/// Fixed system instruction: Apps Script domain, Russian comments, mandatory
/// menu entry point. Shared by every provider.
pub const SYSTEM_PROMPT: &str = "\
Ты — эксперт по Google Apps Script. Пишешь скрипты для автоматизации Google Таблиц, Документов и Диска.

Требования к коду:
- Возвращай только код скрипта, без пояснений до или после.
- Все комментарии в коде — на русском языке.
- Обязательно добавляй функцию onOpen(), создающую пункт меню для запуска скрипта.
- Используй современный синтаксис: const/let, стрелочные функции.
- Обрабатывай ошибки через try/catch и Logger.log.";

/// Build the user message: the task itself plus whatever integration settings
/// the caller filled in.
pub fn build_user_prompt(request: &ScriptRequest) -> String {
    let mut prompt = format!(
        "Напиши Google Apps Script для следующей задачи:\n{}",
        request.prompt.trim()
    );

    let mut context_lines = Vec::new();
    if let Some(folder_id) = non_empty(&request.drive_folder_id) {
        context_lines.push(format!("ID папки Google Drive с прайс-листами: {}", folder_id));
    }
    if let Some(api_url) = non_empty(&request.shop_api_url) {
        context_lines.push(format!("URL API интернет-магазина: {}", api_url));
    }
    if let Some(api_key) = non_empty(&request.shop_api_key) {
        context_lines.push(format!("API-ключ интернет-магазина: {}", api_key));
    }
    if let Some(email) = non_empty(&request.admin_email) {
        context_lines.push(format!("Email администратора для уведомлений: {}", email));
    }

    if !context_lines.is_empty() {
        prompt.push_str("\n\nДанные для интеграции:\n");
        prompt.push_str(&context_lines.join("\n"));
    }

    prompt
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Strip a single wrapping triple-backtick fence from provider output.
///
/// Providers routinely wrap the script in ```` ```javascript ... ``` ````
/// despite being told not to. Only the fence lines are removed; the enclosed
/// lines are returned byte-identical. Anything that is not one fenced block
/// passes through unchanged.
pub fn strip_code_fence(text: &str) -> String {
    let trimmed = text.trim();

    let Some(first_newline) = trimmed.find('\n') else {
        return text.to_string();
    };
    let (first_line, rest) = trimmed.split_at(first_newline);
    if !first_line.starts_with("```") {
        return text.to_string();
    }

    // Past the opening fence line and its newline.
    let inner = &rest[1..];
    let Some(close_idx) = inner.rfind("```") else {
        return text.to_string();
    };
    if !inner[close_idx + 3..].trim().is_empty() {
        return text.to_string();
    }

    let enclosed = &inner[..close_idx];
    // The closing fence has to start a line of its own.
    if !enclosed.is_empty() && !enclosed.ends_with('\n') {
        return text.to_string();
    }
    enclosed.strip_suffix('\n').unwrap_or(enclosed).to_string()
}
