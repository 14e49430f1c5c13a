//! Persona cards drawn as monochrome SVG.

use askama::Template;
use bytes::Bytes;

use crate::application::context::SharedContext;
use crate::application::ports::{PersonaContent, RenderError, RenderPort};
use crate::domain::artifact::{Artifact, SCREEN_HEIGHT, SCREEN_WIDTH};
use crate::domain::device::DeviceKey;
use crate::domain::persona::Persona;

use super::layout::{Align, BodyLayout, CardLine, FOOTER_HEIGHT, STATUS_BAR_HEIGHT};

pub const SVG_MEDIA_TYPE: &str = "image/svg+xml";

/// Inner width of the battery glyph in the status bar.
const BATTERY_GLYPH_WIDTH: u32 = 28;

struct StatusBar {
    date: String,
    time: String,
    weather: String,
    battery: u8,
    battery_fill: u32,
}

#[derive(Template)]
#[template(path = "cards/card.svg")]
struct CardTemplate {
    width: u32,
    height: u32,
    divider_top: u32,
    divider_bottom: u32,
    status: StatusBar,
    lines: Vec<CardLine>,
    persona: &'static str,
}

#[derive(Template)]
#[template(path = "cards/unavailable.svg")]
struct UnavailableTemplate {
    width: u32,
    height: u32,
    device: String,
    voltage: String,
}

/// Renders each persona as a 400×300 SVG card: status bar, body, footer.
#[derive(Debug, Default, Clone)]
pub struct SvgCardRenderer;

impl SvgCardRenderer {
    pub fn new() -> Self {
        Self
    }

    fn artifact(persona: Persona, svg: String) -> Artifact {
        Artifact {
            persona,
            width: SCREEN_WIDTH,
            height: SCREEN_HEIGHT,
            media_type: SVG_MEDIA_TYPE,
            body: Bytes::from(svg),
        }
    }
}

fn status_bar(context: &SharedContext, battery_percent: u8) -> StatusBar {
    let battery = battery_percent.min(100);
    let time = &context.date.time_str;
    StatusBar {
        date: context.date.date_str.clone(),
        time: time.get(..5).unwrap_or(time).to_string(),
        weather: context.weather.weather_str.clone(),
        battery,
        battery_fill: BATTERY_GLYPH_WIDTH * u32::from(battery) / 100,
    }
}

fn attribution(author: &str) -> String {
    format!("- {author}")
}

fn bullets(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| format!("• {item}")).collect()
}

fn field_text<'a>(content: &'a PersonaContent, field: &str) -> &'a str {
    content.text(field).unwrap_or_default()
}

fn body(persona: Persona, content: &PersonaContent) -> Vec<CardLine> {
    let text = |field| field_text(content, field);
    let layout = BodyLayout::new();

    let layout = match persona {
        Persona::Stoic | Persona::Roast => layout
            .text(text("quote"), 20, Align::Center)
            .gap(12)
            .aside(&attribution(text("author")), 14),
        Persona::Zen => layout.heading(text("word"), 64),
        Persona::Daily => layout
            .text(text("quote"), 17, Align::Center)
            .aside(&attribution(text("author")), 13)
            .gap(10)
            .text(&format!("Read: {}", text("book_title")), 14, Align::Left)
            .text(&format!("Tip: {}", text("tip")), 14, Align::Left),
        Persona::Briefing => {
            let mut layout = layout;
            for item in bullets(&content.texts("headlines")) {
                layout = layout.text(&item, 14, Align::Left);
            }
            layout.gap(8).aside(text("insight"), 13)
        }
        Persona::Artwall => layout
            .heading(text("title"), 28)
            .gap(10)
            .aside(text("description"), 15),
        Persona::Recipe => layout
            .heading(text("dish"), 22)
            .gap(6)
            .text(&content.texts("ingredients").join(", "), 14, Align::Center)
            .gap(6)
            .aside(text("tip"), 13),
        Persona::Fitness => {
            let mut layout = layout.heading(text("workout"), 22).gap(4);
            for item in bullets(&content.texts("exercises")) {
                layout = layout.text(&item, 15, Align::Left);
            }
            layout.gap(4).aside(text("tip"), 13)
        }
        Persona::Poetry => {
            let mut layout = layout
                .heading(text("title"), 20)
                .aside(text("author"), 12)
                .gap(6);
            for line in content.texts("lines") {
                layout = layout.text(line, 16, Align::Center);
            }
            layout
        }
        Persona::Countdown => {
            let days = content.number("days").unwrap_or_default();
            let unit = if days == 1 { "day" } else { "days" };
            layout
                .text(text("name"), 20, Align::Center)
                .heading(&days.to_string(), 72)
                .aside(&format!("{unit} to go"), 14)
        }
        Persona::Error => layout.text(text("message"), 16, Align::Center),
    };

    layout.finish()
}

impl RenderPort for SvgCardRenderer {
    fn render(
        &self,
        persona: Persona,
        content: &PersonaContent,
        context: &SharedContext,
        battery_percent: u8,
    ) -> Result<Artifact, RenderError> {
        let template = CardTemplate {
            width: SCREEN_WIDTH,
            height: SCREEN_HEIGHT,
            divider_top: STATUS_BAR_HEIGHT,
            divider_bottom: SCREEN_HEIGHT - FOOTER_HEIGHT,
            status: status_bar(context, battery_percent),
            lines: body(persona, content),
            persona: persona.as_str(),
        };
        let svg = template
            .render()
            .map_err(|err| RenderError::Template(err.to_string()))?;
        Ok(Self::artifact(persona, svg))
    }

    fn render_unavailable(
        &self,
        device: Option<&DeviceKey>,
        voltage: f64,
    ) -> Result<Artifact, RenderError> {
        let template = UnavailableTemplate {
            width: SCREEN_WIDTH,
            height: SCREEN_HEIGHT,
            device: device.map_or_else(|| "unregistered".to_string(), ToString::to_string),
            voltage: format!("{voltage:.2}"),
        };
        let svg = template
            .render()
            .map_err(|err| RenderError::Template(err.to_string()))?;
        Ok(Self::artifact(Persona::Error, svg))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use chrono_tz::Tz;
    use serde_json::json;

    use super::*;
    use crate::application::context::{DateContext, WeatherContext};

    fn context() -> SharedContext {
        let now = Tz::UTC
            .with_ymd_and_hms(2025, 3, 14, 9, 41, 7)
            .single()
            .expect("valid timestamp");
        SharedContext {
            date: DateContext::bare(now),
            weather: WeatherContext::new(18, 1),
        }
    }

    fn render(persona: Persona, content: PersonaContent, battery: u8) -> String {
        let artifact = SvgCardRenderer::new()
            .render(persona, &content, &context(), battery)
            .expect("render");
        assert_eq!(artifact.persona, persona);
        assert_eq!(artifact.media_type, SVG_MEDIA_TYPE);
        assert_eq!((artifact.width, artifact.height), (400, 300));
        String::from_utf8(artifact.body.to_vec()).expect("utf-8 svg")
    }

    #[test]
    fn stoic_card_shows_quote_status_and_footer() {
        let svg = render(
            Persona::Stoic,
            PersonaContent::new()
                .with("quote", "Waste no more time.")
                .with("author", "Marcus Aurelius"),
            73,
        );

        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("Waste no more time."));
        assert!(svg.contains("- Marcus Aurelius"));
        assert!(svg.contains("Mar 14 Fri"));
        assert!(svg.contains("09:41"));
        assert!(svg.contains("18°C"));
        assert!(svg.contains("73%"));
        assert!(svg.contains(">STOIC<"));
    }

    #[test]
    fn generated_text_is_escaped() {
        let svg = render(
            Persona::Zen,
            PersonaContent::new().with("word", "<script>&"),
            50,
        );
        assert!(!svg.contains("<script>"));
        assert!(svg.contains("&lt;script&gt;&amp;"));
    }

    #[test]
    fn list_personas_render_every_item() {
        let svg = render(
            Persona::Fitness,
            PersonaContent::new()
                .with("workout", "Desk reset")
                .with("exercises", json!(["20 squats", "10 push-ups"]))
                .with("tip", "Stand up every hour."),
            100,
        );
        assert!(svg.contains("• 20 squats"));
        assert!(svg.contains("• 10 push-ups"));
    }

    #[test]
    fn countdown_shows_the_day_count() {
        let svg = render(
            Persona::Countdown,
            PersonaContent::new().with("name", "New Year 2026").with("days", 1),
            10,
        );
        assert!(svg.contains(">1<"));
        assert!(svg.contains("day to go"));
    }

    #[test]
    fn battery_glyph_fill_tracks_percentage() {
        assert_eq!(status_bar(&context(), 100).battery_fill, BATTERY_GLYPH_WIDTH);
        assert_eq!(status_bar(&context(), 50).battery_fill, BATTERY_GLYPH_WIDTH / 2);
        assert_eq!(status_bar(&context(), 0).battery_fill, 0);
    }

    #[test]
    fn unavailable_card_names_device_and_voltage() {
        let device = DeviceKey::parse("AA:BB:CC:DD:EE:01").expect("device key");
        let artifact = SvgCardRenderer::new()
            .render_unavailable(Some(&device), 3.1)
            .expect("render");
        let svg = String::from_utf8(artifact.body.to_vec()).expect("utf-8 svg");

        assert_eq!(artifact.persona, Persona::Error);
        assert!(svg.contains("Service Unavailable"));
        assert!(svg.contains("AA:BB:CC:DD:EE:01"));
        assert!(svg.contains("3.10 V"));
    }
}
