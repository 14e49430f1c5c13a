//! Content generators: canned offline content and an OpenAI-compatible chat client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use crate::application::context::SharedContext;
use crate::application::ports::{GenerationError, GenerationPort, PersonaContent};
use crate::domain::device::DeviceProfile;
use crate::domain::persona::Persona;
use crate::infra::error::InfraError;
use crate::infra::http_client;

/// Fields a persona's content must carry for its card to render.
pub fn required_fields(persona: Persona) -> &'static [&'static str] {
    match persona {
        Persona::Stoic | Persona::Roast => &["quote", "author"],
        Persona::Zen => &["word"],
        Persona::Daily => &["quote", "author", "book_title", "tip"],
        Persona::Briefing => &["headlines", "insight"],
        Persona::Artwall => &["title", "description"],
        Persona::Recipe => &["dish", "ingredients", "tip"],
        Persona::Fitness => &["workout", "exercises", "tip"],
        Persona::Poetry => &["title", "author", "lines"],
        Persona::Countdown => &["name", "days"],
        Persona::Error => &["message"],
    }
}

fn missing_field(persona: Persona, content: &PersonaContent) -> Option<&'static str> {
    required_fields(persona)
        .iter()
        .copied()
        .find(|field| !content.has(field))
}

/// Countdown content is pure date arithmetic: the next holiday when known, else the new year.
fn countdown(context: &SharedContext) -> PersonaContent {
    let date = &context.date;
    if !date.upcoming_holiday.is_empty() {
        return PersonaContent::new()
            .with("name", date.upcoming_holiday.as_str())
            .with("days", date.days_until_holiday);
    }
    let remaining = date.days_in_year.saturating_sub(date.day_of_year) + 1;
    PersonaContent::new()
        .with("name", format!("New Year {}", date.year + 1))
        .with("days", remaining)
}

fn unavailable() -> PersonaContent {
    PersonaContent::new().with("message", "Content is temporarily unavailable.")
}

/// Deterministic built-in content; needs no network access.
#[derive(Debug, Default, Clone)]
pub struct CannedGenerator;

const STOIC: &[(&str, &str)] = &[
    (
        "You have power over your mind, not outside events. Realise this, and you will find \
         strength.",
        "Marcus Aurelius",
    ),
    (
        "We suffer more often in imagination than in reality.",
        "Seneca",
    ),
    (
        "No man is free who is not master of himself.",
        "Epictetus",
    ),
];

const ROAST: &[(&str, &str)] = &[
    (
        "Your to-do list has seen more sunrises than you have.",
        "Your Desk",
    ),
    (
        "You refreshed this screen again. The answer is still: go outside.",
        "The Display",
    ),
];

const ZEN: &[&str] = &["Still", "Empty", "Breathe", "Enough", "Now"];

impl CannedGenerator {
    pub fn new() -> Self {
        Self
    }

    fn content(persona: Persona, context: &SharedContext) -> PersonaContent {
        let seed = context.date.day_of_year as usize;
        match persona {
            Persona::Stoic => {
                let (quote, author) = STOIC[seed % STOIC.len()];
                PersonaContent::new()
                    .with("quote", quote)
                    .with("author", author)
            }
            Persona::Roast => {
                let (quote, author) = ROAST[seed % ROAST.len()];
                PersonaContent::new()
                    .with("quote", quote)
                    .with("author", author)
            }
            Persona::Zen => PersonaContent::new().with("word", ZEN[seed % ZEN.len()]),
            Persona::Daily => PersonaContent::new()
                .with("quote", "The best time to plant a tree was twenty years ago.")
                .with("author", "Proverb")
                .with("book_title", "Meditations")
                .with("tip", "Write down one thing you finished today."),
            Persona::Briefing => PersonaContent::new()
                .with(
                    "headlines",
                    json!([
                        "Offline mode: no live headlines",
                        "Configure a content provider for briefings",
                    ]),
                )
                .with("insight", "Quiet news days are good days to ship."),
            Persona::Artwall => PersonaContent::new()
                .with("title", "Horizon")
                .with("description", "One line of ink where sea meets sky."),
            Persona::Recipe => PersonaContent::new()
                .with("dish", "Tomato and egg stir-fry")
                .with("ingredients", json!(["3 eggs", "2 tomatoes", "spring onion"]))
                .with("tip", "Cook the eggs first and fold them back in at the end."),
            Persona::Fitness => PersonaContent::new()
                .with("workout", "Desk reset")
                .with(
                    "exercises",
                    json!(["20 squats", "10 push-ups", "30s plank", "1 min stretch"]),
                )
                .with("tip", "Stand up every hour."),
            Persona::Poetry => PersonaContent::new()
                .with("title", "Dust of Snow")
                .with("author", "Robert Frost")
                .with(
                    "lines",
                    json!([
                        "The way a crow",
                        "Shook down on me",
                        "The dust of snow",
                        "From a hemlock tree",
                    ]),
                ),
            Persona::Countdown => countdown(context),
            Persona::Error => unavailable(),
        }
    }
}

#[async_trait]
impl GenerationPort for CannedGenerator {
    async fn generate(
        &self,
        persona: Persona,
        context: &SharedContext,
        _profile: &DeviceProfile,
    ) -> Result<PersonaContent, GenerationError> {
        Ok(Self::content(persona, context))
    }
}

/// Generates persona content through an OpenAI-compatible `/chat/completions` endpoint.
pub struct ChatCompletionsGenerator {
    client: Client,
    endpoint: Url,
    api_key: String,
    default_model: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage; 2],
    response_format: ResponseFormat,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

impl ChatCompletionsGenerator {
    pub fn new(
        api_base: &Url,
        api_key: impl Into<String>,
        default_model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, InfraError> {
        let endpoint = format!("{}/chat/completions", api_base.as_str().trim_end_matches('/'));
        let endpoint = Url::parse(&endpoint)
            .map_err(|err| InfraError::configuration(format!("invalid api base: {err}")))?;
        let client = http_client(timeout)?;

        Ok(Self {
            client,
            endpoint,
            api_key: api_key.into(),
            default_model: default_model.into(),
        })
    }

    fn system_prompt(profile: &DeviceProfile) -> String {
        let mut prompt = String::from(
            "You write short content for a 400x300 monochrome e-ink display. \
             Reply with a single JSON object and nothing else. Keep every text field brief.",
        );
        if let Some(language) = profile.language.as_deref() {
            prompt.push_str(&format!(" Write in {language}."));
        }
        if let Some(tone) = profile.content_tone.as_deref() {
            prompt.push_str(&format!(" Overall tone: {tone}."));
        }
        if !profile.character_tones.is_empty() {
            prompt.push_str(&format!(
                " Voice it like: {}.",
                profile.character_tones.join(", ")
            ));
        }
        prompt
    }

    fn persona_prompt(persona: Persona, context: &SharedContext) -> String {
        let task = match persona {
            Persona::Stoic => "A Stoic quotation suited to the day, with its author.",
            Persona::Roast => "A playful, affectionate one-line roast of the reader.",
            Persona::Zen => "A single calm word for contemplation.",
            Persona::Daily => "A quote with author, a book recommendation title and a tip.",
            Persona::Briefing => "Three short headline-style items and one insight.",
            Persona::Artwall => "A title and one-sentence description of a minimal line drawing.",
            Persona::Recipe => "A simple seasonal dish, its ingredients and one cooking tip.",
            Persona::Fitness => "A short desk workout: name, a list of exercises and a tip.",
            Persona::Poetry => "A short poem or excerpt: title, author and a list of lines.",
            Persona::Countdown | Persona::Error => "",
        };
        let fields = required_fields(persona).join(", ");
        let date = &context.date;
        let mut prompt = format!(
            "Today is {} ({}), {}. Weather: {}.",
            date.date_str, date.weekday, date.time_str, context.weather.weather_str
        );
        if !date.festival.is_empty() {
            prompt.push_str(&format!(" Today is {}.", date.festival));
        }
        prompt.push_str(&format!("\n{task}\nJSON keys: {fields}."));
        prompt
    }
}

#[async_trait]
impl GenerationPort for ChatCompletionsGenerator {
    async fn generate(
        &self,
        persona: Persona,
        context: &SharedContext,
        profile: &DeviceProfile,
    ) -> Result<PersonaContent, GenerationError> {
        match persona {
            Persona::Countdown => return Ok(countdown(context)),
            Persona::Error => return Ok(unavailable()),
            _ => {}
        }

        let model = profile.llm_model.as_deref().unwrap_or(&self.default_model);
        let request = ChatRequest {
            model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: Self::system_prompt(profile),
                },
                ChatMessage {
                    role: "user",
                    content: Self::persona_prompt(persona, context),
                },
            ],
            response_format: ResponseFormat {
                kind: "json_object",
            },
            temperature: 0.8,
        };

        let response: ChatResponse = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|err| GenerationError::Provider(err.to_string()))?
            .json()
            .await
            .map_err(|err| GenerationError::Malformed(err.to_string()))?;

        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| GenerationError::Malformed("response has no message content".into()))?;
        let value: Value = serde_json::from_str(strip_code_fence(&text))
            .map_err(|err| GenerationError::Malformed(format!("content is not JSON: {err}")))?;
        let content = PersonaContent::from_value(value)?;

        if let Some(field) = missing_field(persona, &content) {
            return Err(GenerationError::Malformed(format!(
                "{persona} content is missing `{field}`"
            )));
        }

        debug!(
            target = "inkcast::generation",
            persona = persona.as_str(),
            model,
            "content generated"
        );
        Ok(content)
    }
}

/// Models sometimes wrap JSON in a Markdown fence despite being asked not to.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}
