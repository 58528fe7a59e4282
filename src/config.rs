//! Loading application configuration (prompt templates + exercise defaults) from TOML.
//!
//! Credentials never live here; each provider reads its own environment variables.
//! See `AppConfig` and `Prompts` for the expected schema.

use serde::Deserialize;
use tracing::{error, info};

pub const DEFAULT_TOPIC: &str = "general academic";

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct AppConfig {
  /// Topic used when a generation request does not name one.
  pub default_topic: String,
  /// Search terms for Describe Image; one is picked at random per request.
  pub image_search_terms: Vec<String>,
  /// BCP-47 language code sent to the transcription provider.
  pub speech_language: String,
  pub prompts: Prompts,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      default_topic: DEFAULT_TOPIC.into(),
      image_search_terms: ["lecture", "graph", "technology", "environment", "cityscape", "laboratory"]
        .into_iter()
        .map(String::from)
        .collect(),
      speech_language: "en-US".into(),
      prompts: Prompts::default(),
    }
  }
}

/// Instruction templates sent to the generative model.
///
/// Generation templates take `{topic}`. Evaluation templates take `{task_type}`,
/// `{original_text}`, `{student_response}`, `{correct_answer}` and `{word_count}`.
/// Structured templates must keep their "raw JSON only" instruction: the response
/// normalizer depends on it.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub read_aloud: String,
  pub repeat_sentence: String,
  pub reorder_paragraph: String,
  pub essay: String,
  pub summarize_written_text: String,
  pub mcsa: String,
  pub answer_short_question: String,
  /// Used for any task name without a dedicated template.
  pub fallback: String,

  pub evaluate_spoken_response: String,
  pub evaluate_essay: String,
  pub evaluate_swt: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      read_aloud: "Generate a short, academic paragraph of about 60-70 words on the topic of '{topic}'. The paragraph should contain some complex vocabulary and varied sentence structure, suitable for a PTE Read Aloud task. Output ONLY the paragraph text.".into(),
      repeat_sentence: "Generate a single, clear sentence between 10 and 15 words long on the topic of '{topic}'. It should be grammatically correct and suitable for a PTE Repeat Sentence task. Output ONLY the sentence.".into(),
      reorder_paragraph: "Generate a coherent academic paragraph of exactly 4 sentences on '{topic}', suitable for a PTE Re-order Paragraphs task. Output the sentences in their correct logical order, one sentence per line. Do not number them, do not add bullets, and do not add any other text.".into(),
      essay: "Generate one PTE Academic essay prompt on the topic of '{topic}'. The prompt should present a debatable statement or question and ask the candidate to discuss it in 200-300 words. Output ONLY the prompt text.".into(),
      summarize_written_text: "Generate a dense, academic text of about 300 words on the topic of '{topic}'. The text must contain several key ideas and supporting details, suitable for a PTE 'Summarize Written Text' task. Output ONLY the text.".into(),
      mcsa: r#"Create a PTE Academic 'Multiple Choice, Single Answer' reading question on the topic of '{topic}'. Write an academic passage of 120-180 words, one question about it, and exactly 4 answer options of which exactly one is correct.
Return ONLY a raw JSON object with exactly these keys and no other text, comments, or markdown formatting like ```json:
{"passage": "<passage>", "question": "<question>", "options": ["<option 1>", "<option 2>", "<option 3>", "<option 4>"], "correct_answer_index": <0-3, index of the correct option>}"#.into(),
      answer_short_question: r#"Create a PTE Academic 'Answer Short Question' item on the topic of '{topic}'. The question must be answerable with one or a few words of general knowledge.
Return ONLY a raw JSON object with exactly these keys and no other text, comments, or markdown formatting like ```json:
{"question": "<question>", "answer": "<short answer>"}"#.into(),
      fallback: "Generate a simple sentence.".into(),

      evaluate_spoken_response: r#"You are an expert PTE Academic examiner. Evaluate the following student's spoken response based on typical PTE criteria: oral fluency, pronunciation, and content. The response was transcribed by speech recognition.

Task Type: {task_type}
Original Text/Task (if applicable): "{original_text}"
Expected Answer (if applicable): "{correct_answer}"
Student's Spoken Transcript: "{student_response}"

Return ONLY a raw JSON object in the following format. Do not include any other text, comments, or markdown formatting like ```json.
{
  "oral_fluency": { "score": <score out of 5>, "feedback": "<brief feedback on rhythm, phrasing, and speed>" },
  "pronunciation": { "score": <score out of 5>, "feedback": "<brief feedback on clarity, vowel/consonant sounds, and stress>" },
  "content": { "score": <score out of 5>, "feedback": "<brief feedback on how well the transcript matches the task>" },
  "overall_score_out_of_90": <estimated overall PTE-style score for this task, out of 90>,
  "final_summary": "<one-sentence summary of the performance>"
}"#.into(),
      evaluate_essay: r#"You are an expert PTE Academic examiner. Evaluate the following essay written in response to the prompt, using the PTE 'Write Essay' criteria.

Essay Prompt: "{original_text}"
Word Count: {word_count}
Student's Essay: "{student_response}"

Return ONLY a raw JSON object in the following format. Do not include any other text, comments, or markdown formatting like ```json.
{
  "content": { "score": <score out of 3>, "feedback": "<how well the essay addresses the prompt>" },
  "form": { "word_count": <number of words>, "score": <score out of 2>, "feedback": "<feedback on length, 200-300 words expected>" },
  "grammar": { "score": <score out of 2>, "feedback": "<feedback on grammatical accuracy>" },
  "vocabulary": { "score": <score out of 2>, "feedback": "<feedback on range and precision of vocabulary>" },
  "structure": { "score": <score out of 2>, "feedback": "<feedback on development, structure and coherence>" },
  "overall_score_out_of_90": <estimated overall PTE-style score, out of 90>,
  "final_summary": "<one-sentence summary of the essay>"
}"#.into(),
      evaluate_swt: r#"You are an expert PTE Academic examiner. Evaluate the following 'Summarize Written Text' response. A valid summary is a single sentence of 5 to 75 words capturing the main points of the original text.

Original Text: "{original_text}"
Word Count: {word_count}
Student's Summary: "{student_response}"

Return ONLY a raw JSON object in the following format. Do not include any other text, comments, or markdown formatting like ```json.
{
  "content": { "score": <score out of 2>, "feedback": "<how well the main points are captured>" },
  "form": { "score": <score out of 1>, "feedback": "<one sentence, 5-75 words?>" },
  "grammar": { "score": <score out of 2>, "feedback": "<feedback on grammatical accuracy>" },
  "vocabulary": { "score": <score out of 2>, "feedback": "<feedback on word choice>" },
  "word_count": <number of words in the summary>,
  "overall_score_out_of_7": <total of the scores above, out of 7>,
  "final_summary": "<one-sentence summary of the performance>"
}"#.into(),
    }
  }
}

/// Load `AppConfig` from PTE_CONFIG_PATH. Missing variable means defaults;
/// IO or parse errors are logged and also fall back to defaults.
/// SPEECH_LANGUAGE, when set, wins over the file.
pub fn load_app_config_from_env() -> AppConfig {
  let mut cfg = match std::env::var("PTE_CONFIG_PATH") {
    Ok(path) => load_app_config(&path).unwrap_or_default(),
    Err(_) => AppConfig::default(),
  };
  if let Some(lang) = std::env::var("SPEECH_LANGUAGE").ok().filter(|l| !l.trim().is_empty()) {
    cfg.speech_language = lang.trim().to_string();
  }
  cfg
}

fn load_app_config(path: &str) -> Option<AppConfig> {
  match std::fs::read_to_string(path) {
    Ok(s) => match parse_app_config(&s) {
      Ok(cfg) => {
        info!(target: "pte_backend", %path, "Loaded app config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "pte_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "pte_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

pub fn parse_app_config(s: &str) -> Result<AppConfig, toml::de::Error> {
  let mut cfg = toml::from_str::<AppConfig>(s)?;
  if cfg.default_topic.trim().is_empty() {
    cfg.default_topic = DEFAULT_TOPIC.into();
  }
  if cfg.image_search_terms.iter().all(|t| t.trim().is_empty()) {
    cfg.image_search_terms = AppConfig::default().image_search_terms;
  }
  Ok(cfg)
}
