//! Render [`VoiceResponse`] as Twilio TwiML.

use axum::http::header;
use axum::response::{IntoResponse, Response};
use vani_core::{Language, VoiceAction, VoiceResponse};

/// Polly voice for each supported language.
fn voice_for(language: Language) -> &'static str {
    match language {
        Language::English => "Polly.Joanna",
        Language::Hindi => "Polly.Aditi",
    }
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

fn render_action(action: &VoiceAction, out: &mut String) {
    match action {
        VoiceAction::Say { text, language } => {
            out.push_str(&format!(
                "<Say voice=\"{}\" language=\"{}\">{}</Say>",
                voice_for(*language),
                language.tag(),
                escape(text)
            ));
        }
        VoiceAction::Play { audio } => {
            out.push_str(&format!("<Play>{}</Play>", escape(audio.url())));
        }
        VoiceAction::Pause { secs } => {
            out.push_str(&format!("<Pause length=\"{secs}\"/>"));
        }
        VoiceAction::Gather { num_digits, timeout_secs, action, prompt } => {
            out.push_str(&format!(
                "<Gather numDigits=\"{num_digits}\" timeout=\"{timeout_secs}\" action=\"{}\" method=\"POST\">",
                action.path()
            ));
            for inner in prompt {
                render_action(inner, out);
            }
            out.push_str("</Gather>");
        }
        VoiceAction::Record { max_length_secs, finish_on_key, action, play_beep } => {
            out.push_str(&format!(
                "<Record maxLength=\"{max_length_secs}\" finishOnKey=\"{}\" action=\"{}\" method=\"POST\" playBeep=\"{play_beep}\"/>",
                escape(&finish_on_key.to_string()),
                action.path()
            ));
        }
        VoiceAction::Redirect { route } => {
            out.push_str(&format!("<Redirect method=\"POST\">{}</Redirect>", route.path()));
        }
        VoiceAction::Hangup => out.push_str("<Hangup/>"),
    }
}

/// Full TwiML document for `response`.
pub fn render(response: &VoiceResponse) -> String {
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response>");
    for action in &response.actions {
        render_action(action, &mut out);
    }
    out.push_str("</Response>");
    out
}

/// `text/xml` response wrapper for handlers.
pub struct TwiML(pub VoiceResponse);

impl IntoResponse for TwiML {
    fn into_response(self) -> Response {
        ([(header::CONTENT_TYPE, "text/xml")], render(&self.0)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vani_core::{AudioRef, Route};

    #[test]
    fn menu_gather_renders_with_voice_and_redirect() {
        let r = VoiceResponse::new()
            .menu_gather(vec![vani_core::VoiceAction::Say {
                text: "Press 1 & listen".into(),
                language: Language::English,
            }])
            .redirect(Route::Welcome);
        let xml = render(&r);
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response>"));
        assert!(xml.contains(
            "<Gather numDigits=\"1\" timeout=\"10\" action=\"/ivr/menu\" method=\"POST\">\
             <Say voice=\"Polly.Joanna\" language=\"en-US\">Press 1 &amp; listen</Say></Gather>"
        ));
        assert!(xml.ends_with("<Redirect method=\"POST\">/ivr/welcome</Redirect></Response>"));
    }

    #[test]
    fn record_and_play_render() {
        let r = VoiceResponse::new()
            .say("नमस्ते", Language::Hindi)
            .play(AudioRef::new("https://x/audio/a.mp3?a=1&b=2"))
            .record(10, '#', Route::SubjectRecorded)
            .pause(1)
            .hangup();
        let xml = render(&r);
        assert!(xml.contains("<Say voice=\"Polly.Aditi\" language=\"hi-IN\">नमस्ते</Say>"));
        assert!(xml.contains("<Play>https://x/audio/a.mp3?a=1&amp;b=2</Play>"));
        assert!(xml.contains(
            "<Record maxLength=\"10\" finishOnKey=\"#\" action=\"/ivr/process-summary\" method=\"POST\" playBeep=\"true\"/>"
        ));
        assert!(xml.contains("<Pause length=\"1\"/><Hangup/>"));
    }
}
