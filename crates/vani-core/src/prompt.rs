//! Gateway-neutral voice instructions returned for every webhook.
//!
//! The gateway renders a [`VoiceResponse`] into its own markup (TwiML for Twilio).

use serde::Serialize;

use crate::providers::AudioRef;
use crate::session::Language;

/// Webhook routes the telephony gateway posts back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Route {
    Welcome,
    Menu,
    QuestionRecorded,
    SubjectRecorded,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Welcome => "/ivr/welcome",
            Route::Menu => "/ivr/menu",
            Route::QuestionRecorded => "/ivr/question-recorded",
            Route::SubjectRecorded => "/ivr/process-summary",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "verb", rename_all = "camelCase")]
pub enum VoiceAction {
    Say { text: String, language: Language },
    Play { audio: AudioRef },
    Pause { secs: u32 },
    /// Collect digits while speaking `prompt`, then post them to `action`.
    #[serde(rename_all = "camelCase")]
    Gather {
        num_digits: u32,
        timeout_secs: u32,
        action: Route,
        prompt: Vec<VoiceAction>,
    },
    #[serde(rename_all = "camelCase")]
    Record {
        max_length_secs: u32,
        finish_on_key: char,
        action: Route,
        play_beep: bool,
    },
    Redirect { route: Route },
    Hangup,
}

/// Ordered list of instructions for one webhook reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VoiceResponse {
    pub actions: Vec<VoiceAction>,
}

impl VoiceResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn say(mut self, text: impl Into<String>, language: Language) -> Self {
        self.actions.push(VoiceAction::Say { text: text.into(), language });
        self
    }

    pub fn play(mut self, audio: AudioRef) -> Self {
        self.actions.push(VoiceAction::Play { audio });
        self
    }

    pub fn pause(mut self, secs: u32) -> Self {
        self.actions.push(VoiceAction::Pause { secs });
        self
    }

    /// Single-digit gather posting to the menu.
    pub fn menu_gather(mut self, prompt: Vec<VoiceAction>) -> Self {
        self.actions.push(VoiceAction::Gather {
            num_digits: 1,
            timeout_secs: 10,
            action: Route::Menu,
            prompt,
        });
        self
    }

    pub fn record(mut self, max_length_secs: u32, finish_on_key: char, action: Route) -> Self {
        self.actions.push(VoiceAction::Record {
            max_length_secs,
            finish_on_key,
            action,
            play_beep: true,
        });
        self
    }

    pub fn redirect(mut self, route: Route) -> Self {
        self.actions.push(VoiceAction::Redirect { route });
        self
    }

    pub fn hangup(mut self) -> Self {
        self.actions.push(VoiceAction::Hangup);
        self
    }

    /// Every spoken sentence, nested gathers included. Handy for assertions and logs.
    pub fn spoken_text(&self) -> String {
        fn walk(actions: &[VoiceAction], out: &mut Vec<String>) {
            for a in actions {
                match a {
                    VoiceAction::Say { text, .. } => out.push(text.clone()),
                    VoiceAction::Gather { prompt, .. } => walk(prompt, out),
                    _ => {}
                }
            }
        }
        let mut out = Vec::new();
        walk(&self.actions, &mut out);
        out.join(" ")
    }

    pub fn plays_audio(&self) -> bool {
        self.actions.iter().any(|a| matches!(a, VoiceAction::Play { .. }))
    }

    pub fn records(&self) -> Option<Route> {
        self.actions.iter().find_map(|a| match a {
            VoiceAction::Record { action, .. } => Some(*action),
            _ => None,
        })
    }

    pub fn hangs_up(&self) -> bool {
        self.actions.iter().any(|a| matches!(a, VoiceAction::Hangup))
    }
}

/// Shorthand for a prompt sentence inside a gather.
pub fn say(text: impl Into<String>, language: Language) -> VoiceAction {
    VoiceAction::Say { text: text.into(), language }
}
