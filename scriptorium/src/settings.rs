//! Process configuration, read once at startup and passed explicitly.

use std::env;
use std::str::FromStr;

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.is_empty())
}

#[derive(Debug, Clone)]
pub struct Settings {
    /// OpenAI-compatible endpoint of the local backend.
    pub chat_base_url: String,
    pub chat_model: String,

    // Sampling per agent role. Creative work runs hot, analytical work cold.
    pub writer_temperature: f32,
    pub editor_temperature: f32,
    pub analyst_temperature: f32,
    pub strategist_temperature: f32,
    pub outline_reviewer_temperature: f32,
    pub research_temperature: f32,
    pub max_tokens: u32,

    pub max_iterations: u32,
    pub max_outline_revisions: u32,

    pub enable_web_search: bool,
    pub search_provider: String,
    pub search_api_key: Option<String>,
    pub max_search_results_per_query: usize,

    pub checkpoint_db_path: String,
    pub default_book_chapters: u32,
    pub output_dir: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            chat_base_url: "http://localhost:1234/v1".to_string(),
            chat_model: "qwen".to_string(),
            writer_temperature: 0.8,
            editor_temperature: 0.3,
            analyst_temperature: 0.4,
            strategist_temperature: 0.6,
            outline_reviewer_temperature: 0.3,
            research_temperature: 0.3,
            max_tokens: 2000,
            max_iterations: 10,
            max_outline_revisions: 3,
            enable_web_search: true,
            search_provider: "duckduckgo".to_string(),
            search_api_key: None,
            max_search_results_per_query: 5,
            checkpoint_db_path: "data/checkpoints.sqlite".to_string(),
            default_book_chapters: 12,
            output_dir: "output".to_string(),
        }
    }
}

impl Settings {
    /// Reads overrides from the environment (a `.env` file counts once the
    /// caller has loaded it). Unset or unparsable variables keep defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            chat_base_url: env_or("CHAT_BASE_URL", defaults.chat_base_url),
            chat_model: env_or("CHAT_MODEL", defaults.chat_model),
            writer_temperature: env_or("WRITER_TEMPERATURE", defaults.writer_temperature),
            editor_temperature: env_or("EDITOR_TEMPERATURE", defaults.editor_temperature),
            analyst_temperature: env_or("ANALYST_TEMPERATURE", defaults.analyst_temperature),
            strategist_temperature: env_or(
                "STRATEGIST_TEMPERATURE",
                defaults.strategist_temperature,
            ),
            outline_reviewer_temperature: env_or(
                "OUTLINE_REVIEWER_TEMPERATURE",
                defaults.outline_reviewer_temperature,
            ),
            research_temperature: env_or("RESEARCH_TEMPERATURE", defaults.research_temperature),
            max_tokens: env_or("MAX_TOKENS", defaults.max_tokens),
            max_iterations: env_or("MAX_ITERATIONS", defaults.max_iterations),
            max_outline_revisions: env_or(
                "MAX_OUTLINE_REVISIONS",
                defaults.max_outline_revisions,
            ),
            enable_web_search: env_or("ENABLE_WEB_SEARCH", defaults.enable_web_search),
            search_provider: env_or("SEARCH_PROVIDER", defaults.search_provider),
            search_api_key: env_opt("SEARCH_API_KEY"),
            max_search_results_per_query: env_or(
                "MAX_SEARCH_RESULTS_PER_QUERY",
                defaults.max_search_results_per_query,
            ),
            checkpoint_db_path: env_or("CHECKPOINT_DB_PATH", defaults.checkpoint_db_path),
            default_book_chapters: env_or(
                "DEFAULT_BOOK_CHAPTERS",
                defaults.default_book_chapters,
            ),
            output_dir: env_or("OUTPUT_DIR", defaults.output_dir),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let settings = Settings::default();
        assert_eq!(settings.chat_base_url, "http://localhost:1234/v1");
        assert_eq!(settings.max_iterations, 10);
        assert_eq!(settings.max_outline_revisions, 3);
        assert_eq!(settings.search_provider, "duckduckgo");
        assert!((settings.writer_temperature - 0.8).abs() < f32::EPSILON);
    }
}
