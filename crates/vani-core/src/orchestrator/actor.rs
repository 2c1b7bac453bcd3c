//! The task that owns one call's [`Session`].

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::pipeline::{spawn_persist, synthesize_or_fallback, timed_stage, Persist};
use super::prompts;
use super::{Inbound, Outcome, RecordingKind, Reply, Shared};
use crate::error::{Feature, ProviderError, ProviderResult};
use crate::event::{CallPhase, EventBody, LogLevel, Stage, StageStatus};
use crate::prompt::{say, Route, VoiceAction, VoiceResponse};
use crate::providers::{AudioRef, QaPair};
use crate::session::{CallState, Language, Session};
use crate::subjects::extract_subject_name;

pub(crate) enum Command {
    Inbound { input: Inbound, reply: oneshot::Sender<Reply> },
    TranscriptionDone { capture: u64, result: ProviderResult<String> },
    RecordingCeiling { capture: u64 },
    ProcessingCeiling { capture: u64 },
    SubjectCeiling { token: u64 },
    Snapshot { reply: oneshot::Sender<Session> },
}

/// Progress of the current question, from digit 1 until its transcription lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Capture {
    Idle,
    Recording,
    AwaitingAudio,
    Transcribing,
}

struct CachedAnswer {
    question: String,
    audio: Option<AudioRef>,
}

/// Where a state sits in the pipeline view of the dashboard.
fn stage_for(state: CallState) -> (Stage, StageStatus) {
    match state {
        CallState::Welcome | CallState::LanguageSelect | CallState::Menu => {
            (Stage::Intake, StageStatus::Active)
        }
        CallState::Recording => (Stage::Intake, StageStatus::Processing),
        CallState::Processing => (Stage::Transcription, StageStatus::Processing),
        CallState::Summary => (Stage::Retrieval, StageStatus::Active),
        CallState::Speaking => (Stage::Delivery, StageStatus::Active),
        CallState::Ended | CallState::Idle => (Stage::Delivery, StageStatus::Complete),
    }
}

pub(crate) struct SessionActor {
    shared: Arc<Shared>,
    actor_id: u64,
    tx: mpsc::Sender<Command>,
    session: Session,
    ended: bool,
    capture: Capture,
    capture_seq: u64,
    subject_token: u64,
    transcription: Option<JoinHandle<()>>,
    recording_timer: Option<JoinHandle<()>>,
    processing_timer: Option<JoinHandle<()>>,
    subject_timer: Option<JoinHandle<()>>,
    /// Apology for an asynchronous failure, spoken at the start of the next reply.
    notice: Option<String>,
    cached: Option<CachedAnswer>,
}

fn abort(handle: &mut Option<JoinHandle<()>>) {
    if let Some(h) = handle.take() {
        h.abort();
    }
}

impl SessionActor {
    pub(crate) fn new(
        shared: Arc<Shared>,
        actor_id: u64,
        tx: mpsc::Sender<Command>,
        session: Session,
    ) -> Self {
        Self {
            shared,
            actor_id,
            tx,
            session,
            ended: false,
            capture: Capture::Idle,
            capture_seq: 0,
            subject_token: 0,
            transcription: None,
            recording_timer: None,
            processing_timer: None,
            subject_timer: None,
            notice: None,
            cached: None,
        }
    }

    pub(crate) async fn run(mut self, mut rx: mpsc::Receiver<Command>) {
        while let Some(cmd) = rx.recv().await {
            match cmd {
                Command::Inbound { input, reply } => {
                    let r = self.handle(input).await;
                    let _ = reply.send(r);
                }
                Command::TranscriptionDone { capture, result } => {
                    self.on_transcription(capture, result)
                }
                Command::RecordingCeiling { capture } => self.on_recording_ceiling(capture),
                Command::ProcessingCeiling { capture } => self.on_processing_ceiling(capture),
                Command::SubjectCeiling { token } => self.on_subject_ceiling(token),
                Command::Snapshot { reply } => {
                    let _ = reply.send(self.session.clone());
                }
            }
            if self.ended {
                break;
            }
        }
        self.release();
        debug!(target: "vani::orchestrator", call_id = %self.session.id, "session task finished");
    }

    async fn handle(&mut self, input: Inbound) -> Reply {
        match input {
            Inbound::Accepted { caller, orphan } => self.on_accepted(caller, orphan),
            Inbound::Digits(digits) => self.on_digits(&digits).await,
            Inbound::RecordingFinished { kind: RecordingKind::Question, audio } => {
                self.on_question_recorded(audio)
            }
            Inbound::RecordingFinished { kind: RecordingKind::Subject, audio } => {
                self.on_subject_recorded(audio).await
            }
            Inbound::Hangup { goodbye } => self.end_call(goodbye),
        }
    }

    // ── state plumbing ──────────────────────────────────────────────────────

    fn lang(&self) -> Language {
        self.session.language
    }

    fn publish(&self, body: EventBody) {
        self.shared.bus.publish(body);
    }

    fn log(&self, level: LogLevel, message: impl Into<String>) {
        self.publish(EventBody::call_log(level, &self.session.id, message));
    }

    fn transition(&mut self, next: CallState) {
        let prev = self.session.state;
        self.session.state = next;
        let (stage, status) = stage_for(next);
        self.publish(EventBody::PipelineStageUpdate {
            call_id: self.session.id.clone(),
            stage,
            status,
            state: Some(next),
            duration_ms: None,
            detail: None,
        });
        debug!(target: "vani::orchestrator", call_id = %self.session.id, from = %prev, to = %next, "transition");
    }

    fn arm(&self, after: Duration, cmd: Command) -> JoinHandle<()> {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            let _ = tx.send(cmd).await;
        })
    }

    fn release(&mut self) {
        abort(&mut self.transcription);
        abort(&mut self.recording_timer);
        abort(&mut self.processing_timer);
        abort(&mut self.subject_timer);
    }

    /// Reply shape shared by most branches: pending notice, `lead`, then a digit gather
    /// speaking `menu`, and a redirect to the welcome route if the caller stays silent.
    fn reply(&mut self, lead: Vec<VoiceAction>, menu: &str, outcome: Outcome) -> Reply {
        let lang = self.lang();
        let mut response = VoiceResponse::new();
        if let Some(notice) = self.notice.take() {
            response = response.say(notice, lang);
        }
        response.actions.extend(lead);
        let response = response
            .menu_gather(vec![say(menu, lang)])
            .redirect(Route::Welcome);
        Reply { response, state: self.session.state, outcome }
    }

    fn main_menu(&mut self, lead: Vec<VoiceAction>, outcome: Outcome) -> Reply {
        let menu = prompts::main_menu(self.lang());
        self.reply(lead, menu, outcome)
    }

    /// Fallback for any failed stage: apology, back to Welcome.
    fn fail(&mut self, feature: Feature) -> Reply {
        let lang = self.lang();
        self.transition(CallState::Welcome);
        self.main_menu(
            vec![say(prompts::apology(lang, feature), lang)],
            Outcome::ProviderUnavailable(feature),
        )
    }

    /// A stage that is not configured at all: announce it, then fall back.
    fn unavailable(&mut self, feature: Feature) -> Reply {
        warn!(target: "vani::orchestrator", call_id = %self.session.id, %feature, "feature unavailable");
        self.shared
            .bus
            .feature_status(feature, false, Some("provider not configured".to_string()));
        self.fail(feature)
    }

    fn invalid(&mut self) -> Reply {
        let lang = self.lang();
        if self.session.state == CallState::Recording {
            abort(&mut self.recording_timer);
        }
        abort(&mut self.processing_timer);
        abort(&mut self.subject_timer);
        self.log(LogLevel::Warning, "Invalid menu option");
        self.transition(CallState::Welcome);
        self.main_menu(vec![say(prompts::invalid_option(lang), lang)], Outcome::InvalidInput)
    }

    // ── inputs ──────────────────────────────────────────────────────────────

    fn on_accepted(&mut self, caller: String, orphan: bool) -> Reply {
        if self.session.caller_address.is_empty() && !caller.is_empty() {
            self.session.caller_address = caller;
        }
        if self.session.state != CallState::Idle {
            // Redirect back to the welcome route for a live call.
            if self.session.state == CallState::Summary {
                abort(&mut self.subject_timer);
            }
            if self.session.state == CallState::Processing {
                // Only 2 and 3 are live while the question is transcribed.
                let lang = self.lang();
                return self.reply(
                    vec![say(prompts::question_received(lang), lang)],
                    prompts::answer_prompt(lang),
                    Outcome::Advanced,
                );
            }
            self.transition(CallState::Welcome);
            return self.main_menu(Vec::new(), Outcome::Advanced);
        }

        info!(target: "vani::orchestrator", call_id = %self.session.id, caller = %self.session.caller_address, orphan, "📞 call started");
        self.publish(EventBody::CallLifecycle {
            call_id: self.session.id.clone(),
            phase: CallPhase::Started,
            caller: Some(self.session.caller_address.clone()).filter(|c| !c.is_empty()),
        });
        if orphan {
            self.log(LogLevel::Warning, "Input for unknown call; starting a fresh session");
        }
        self.transition(CallState::Welcome);
        self.transition(CallState::LanguageSelect);
        let outcome = if orphan { Outcome::SessionNotFound } else { Outcome::Advanced };
        self.reply(Vec::new(), prompts::language_menu(), outcome)
    }

    async fn on_digits(&mut self, digits: &str) -> Reply {
        let Some(digit) = digits.trim().chars().next() else {
            return self.invalid();
        };
        let lang = self.lang();
        match (self.session.state, digit) {
            (CallState::LanguageSelect, '1' | '2') => {
                self.session.language = Language::from_digit(digit).unwrap_or_default();
                self.transition(CallState::Menu);
                self.main_menu(Vec::new(), Outcome::Advanced)
            }
            (CallState::Welcome | CallState::Menu, '1') => self.start_recording(),
            (CallState::Welcome | CallState::Menu, '2') => {
                if self.capture == Capture::Idle {
                    self.main_menu(vec![say(prompts::nothing_recording(lang), lang)], Outcome::NoOp)
                } else {
                    self.stop_recording()
                }
            }
            (CallState::Welcome | CallState::Menu, '3') => self.answer().await,
            (CallState::Welcome | CallState::Menu, '4') => self.start_summary(),
            (CallState::Welcome | CallState::Menu, '5') => {
                self.transition(CallState::Menu);
                self.main_menu(Vec::new(), Outcome::Advanced)
            }
            (CallState::Welcome | CallState::Menu, '9') => self.end_call(true),
            (CallState::Recording, '2') => self.stop_recording(),
            (CallState::Processing, '2') => self.reply(
                vec![say(prompts::question_received(lang), lang)],
                prompts::answer_prompt(lang),
                Outcome::NoOp,
            ),
            (CallState::Processing, '3') => self.still_processing(),
            _ => self.invalid(),
        }
    }

    fn still_processing(&mut self) -> Reply {
        let lang = self.lang();
        self.log(LogLevel::Info, "Answer requested before transcription finished");
        self.reply(
            vec![say(prompts::still_processing(lang), lang)],
            prompts::answer_prompt(lang),
            Outcome::StillProcessing,
        )
    }

    fn start_recording(&mut self) -> Reply {
        if !self.shared.providers.transcriber.is_available() {
            return self.unavailable(Feature::Transcription);
        }
        abort(&mut self.transcription);
        abort(&mut self.processing_timer);
        abort(&mut self.recording_timer);
        self.capture_seq += 1;
        self.capture = Capture::Recording;
        self.session.pending_question_text = None;
        self.cached = None;
        self.transition(CallState::Recording);

        let ceiling = self.shared.config.recording_ceiling;
        self.recording_timer =
            Some(self.arm(ceiling, Command::RecordingCeiling { capture: self.capture_seq }));

        let lang = self.lang();
        let mut response = VoiceResponse::new();
        if let Some(notice) = self.notice.take() {
            response = response.say(notice, lang);
        }
        let response = response
            .say(prompts::ask_question(lang), lang)
            .record(ceiling.as_secs().max(1) as u32, '2', Route::QuestionRecorded);
        Reply { response, state: self.session.state, outcome: Outcome::Advanced }
    }

    fn enter_processing(&mut self) {
        abort(&mut self.recording_timer);
        if self.session.state != CallState::Processing {
            self.transition(CallState::Processing);
        }
        abort(&mut self.processing_timer);
        self.processing_timer = Some(self.arm(
            self.shared.config.processing_ceiling,
            Command::ProcessingCeiling { capture: self.capture_seq },
        ));
    }

    fn stop_recording(&mut self) -> Reply {
        if self.capture == Capture::Recording {
            self.capture = Capture::AwaitingAudio;
        }
        self.enter_processing();
        let lang = self.lang();
        self.reply(
            vec![say(prompts::question_received(lang), lang)],
            prompts::answer_prompt(lang),
            Outcome::Advanced,
        )
    }

    fn on_recording_ceiling(&mut self, capture: u64) {
        if capture != self.capture_seq || self.session.state != CallState::Recording {
            return;
        }
        self.recording_timer = None;
        self.capture = Capture::AwaitingAudio;
        self.log(LogLevel::Info, "Recording ceiling reached");
        self.enter_processing();
    }

    fn on_question_recorded(&mut self, audio: Option<AudioRef>) -> Reply {
        let lang = self.lang();
        if !matches!(self.capture, Capture::Recording | Capture::AwaitingAudio) {
            debug!(target: "vani::orchestrator", call_id = %self.session.id, "question recording without an open capture");
            return self.main_menu(Vec::new(), Outcome::NoOp);
        }
        abort(&mut self.recording_timer);

        let Some(audio) = audio.filter(|a| !a.url().trim().is_empty()) else {
            self.capture = Capture::Idle;
            abort(&mut self.processing_timer);
            self.log(LogLevel::Warning, "Recording finished without audio");
            self.transition(CallState::Welcome);
            return self.main_menu(
                vec![say(prompts::apology(lang, Feature::Transcription), lang)],
                Outcome::NoQuestion,
            );
        };
        if !self.shared.providers.transcriber.is_available() {
            self.capture = Capture::Idle;
            abort(&mut self.processing_timer);
            return self.unavailable(Feature::Transcription);
        }

        self.capture = Capture::Transcribing;
        self.publish(EventBody::stage(&self.session.id, Stage::Intake, StageStatus::Complete));
        let bus = self.shared.bus.clone();
        let transcriber = self.shared.providers.transcriber.clone();
        let call_id = self.session.id.clone();
        let limit = self.shared.config.stage_timeout;
        let tx = self.tx.clone();
        let capture = self.capture_seq;
        abort(&mut self.transcription);
        self.transcription = Some(tokio::spawn(async move {
            let result = timed_stage(
                &bus,
                &call_id,
                Stage::Transcription,
                limit,
                transcriber.transcribe(&audio),
            )
            .await;
            let _ = tx.send(Command::TranscriptionDone { capture, result }).await;
        }));

        if matches!(self.session.state, CallState::Recording | CallState::Processing) {
            self.enter_processing();
        }
        self.reply(
            vec![say(prompts::question_received(lang), lang)],
            prompts::answer_prompt(lang),
            Outcome::Advanced,
        )
    }

    fn on_transcription(&mut self, capture: u64, result: ProviderResult<String>) {
        if capture != self.capture_seq || self.capture != Capture::Transcribing {
            debug!(target: "vani::orchestrator", call_id = %self.session.id, capture, "stale transcription ignored");
            return;
        }
        self.transcription = None;
        self.capture = Capture::Idle;
        abort(&mut self.processing_timer);
        let lang = self.lang();
        let in_processing = self.session.state == CallState::Processing;

        match result {
            Ok(text) if !text.trim().is_empty() => {
                let text = text.trim().to_string();
                info!(target: "vani::orchestrator", call_id = %self.session.id, question = %text, "📝 question transcribed");
                self.log(LogLevel::Success, format!("Question: {text}"));
                self.session.pending_question_text = Some(text);
                self.cached = None;
                if in_processing {
                    self.transition(CallState::Menu);
                }
            }
            Ok(_) => {
                self.log(LogLevel::Warning, "Transcription was empty");
                self.notice = Some(prompts::apology(lang, Feature::Transcription).to_string());
                if in_processing {
                    self.transition(CallState::Welcome);
                }
            }
            Err(_) => {
                self.notice = Some(prompts::apology(lang, Feature::Transcription).to_string());
                if in_processing {
                    self.transition(CallState::Welcome);
                }
            }
        }
    }

    fn on_processing_ceiling(&mut self, capture: u64) {
        if capture != self.capture_seq
            || self.session.state != CallState::Processing
            || self.capture == Capture::Idle
        {
            return;
        }
        self.processing_timer = None;
        abort(&mut self.transcription);
        self.capture = Capture::Idle;
        let secs = self.shared.config.processing_ceiling.as_secs();
        self.publish(EventBody::PipelineStageUpdate {
            call_id: self.session.id.clone(),
            stage: Stage::Transcription,
            status: StageStatus::Error,
            state: None,
            duration_ms: None,
            detail: Some(format!("no transcription within {secs}s")),
        });
        self.log(LogLevel::Error, format!("Transcription did not finish within {secs}s"));
        self.notice = Some(prompts::apology(self.lang(), Feature::Transcription).to_string());
        self.transition(CallState::Welcome);
    }

    async fn answer(&mut self) -> Reply {
        let lang = self.lang();
        let Some(question) = self.session.pending_question_text.clone() else {
            if self.capture != Capture::Idle {
                return self.still_processing();
            }
            self.transition(CallState::Menu);
            return self.main_menu(vec![say(prompts::no_question(lang), lang)], Outcome::NoQuestion);
        };

        let replay = self
            .cached
            .as_ref()
            .filter(|c| c.question == question)
            .map(|c| c.audio.clone());
        let audio = match (replay, self.session.last_answer_text.clone()) {
            (Some(audio), Some(_)) => audio,
            _ => {
                let providers = self.shared.providers.clone();
                if !providers.generator.is_available() {
                    return self.unavailable(Feature::Generation);
                }
                let limit = self.shared.config.stage_timeout;
                let bus = self.shared.bus.clone();
                let answered = timed_stage(
                    &bus,
                    &self.session.id,
                    Stage::AnswerGeneration,
                    limit,
                    providers.generator.answer(&question),
                )
                .await;
                let answer = match answered {
                    Ok(a) => a.trim().to_string(),
                    Err(e) => return self.fail(e.feature()),
                };
                self.session.last_answer_text = Some(answer.clone());
                spawn_persist(Persist {
                    bus: bus.clone(),
                    generator: providers.generator.clone(),
                    history: providers.history.clone(),
                    call_id: self.session.id.clone(),
                    caller: self.session.caller_address.clone(),
                    question: question.clone(),
                    answer: answer.clone(),
                    limit,
                });
                let audio = synthesize_or_fallback(
                    &bus,
                    &providers.synthesizer,
                    &self.session.id,
                    &answer,
                    limit,
                )
                .await;
                self.cached = Some(CachedAnswer { question, audio: audio.clone() });
                audio
            }
        };

        let spoken = match audio {
            Some(a) => VoiceAction::Play { audio: a },
            None => say(self.session.last_answer_text.clone().unwrap_or_default(), lang),
        };
        self.deliver(vec![say(prompts::here_is_answer(lang), lang), spoken], prompts::after_answer(lang))
    }

    /// Speaking → Menu around a finished answer or summary.
    fn deliver(&mut self, lead: Vec<VoiceAction>, menu: &str) -> Reply {
        self.transition(CallState::Speaking);
        let mut reply = self.reply(lead, menu, Outcome::Advanced);
        self.publish(EventBody::stage(&self.session.id, Stage::Delivery, StageStatus::Complete));
        self.transition(CallState::Menu);
        reply.state = self.session.state;
        reply
    }

    fn start_summary(&mut self) -> Reply {
        let p = &self.shared.providers;
        let missing = if !p.history.is_available() {
            Some(Feature::History)
        } else if !p.transcriber.is_available() {
            Some(Feature::Transcription)
        } else {
            None
        };
        if let Some(feature) = missing {
            return self.unavailable(feature);
        }

        self.subject_token += 1;
        self.transition(CallState::Summary);
        let ceiling = self.shared.config.subject_recording_ceiling;
        abort(&mut self.subject_timer);
        self.subject_timer = Some(self.arm(
            ceiling + self.shared.config.stage_timeout,
            Command::SubjectCeiling { token: self.subject_token },
        ));

        let lang = self.lang();
        let response = VoiceResponse::new()
            .say(prompts::ask_subject(lang), lang)
            .record(ceiling.as_secs().max(1) as u32, '#', Route::SubjectRecorded);
        Reply { response, state: self.session.state, outcome: Outcome::Advanced }
    }

    fn on_subject_ceiling(&mut self, token: u64) {
        if token != self.subject_token || self.session.state != CallState::Summary {
            return;
        }
        self.subject_timer = None;
        self.log(LogLevel::Warning, "No subject recording arrived");
        self.notice = Some(prompts::subject_not_heard(self.lang()).to_string());
        self.transition(CallState::Welcome);
    }

    async fn on_subject_recorded(&mut self, audio: Option<AudioRef>) -> Reply {
        let lang = self.lang();
        if self.session.state != CallState::Summary {
            debug!(target: "vani::orchestrator", call_id = %self.session.id, "subject recording outside summary");
            return self.main_menu(Vec::new(), Outcome::NoOp);
        }
        abort(&mut self.subject_timer);

        let not_heard = |actor: &mut Self| {
            actor.transition(CallState::Welcome);
            actor.main_menu(vec![say(prompts::subject_not_heard(lang), lang)], Outcome::InvalidInput)
        };
        let Some(audio) = audio.filter(|a| !a.url().trim().is_empty()) else {
            return not_heard(self);
        };

        let providers = self.shared.providers.clone();
        let bus = self.shared.bus.clone();
        let limit = self.shared.config.stage_timeout;
        let call_id = self.session.id.clone();

        let text = match timed_stage(&bus, &call_id, Stage::Transcription, limit, providers.transcriber.transcribe(&audio)).await {
            Ok(t) => t,
            Err(e) => return self.fail(e.feature()),
        };
        let Some(subject) = extract_subject_name(&text) else {
            self.log(LogLevel::Warning, format!("No subject in \"{}\"", text.trim()));
            return not_heard(self);
        };
        info!(target: "vani::orchestrator", call_id = %call_id, subject = %subject, "📊 summary requested");
        self.log(LogLevel::Info, format!("Summary requested for {subject}"));
        self.session.last_subject = Some(subject.clone());

        let caller = self.session.caller_address.clone();
        let history_limit = self.shared.config.summary_history_limit;
        let history = providers.history.clone();
        let records = timed_stage(&bus, &call_id, Stage::Retrieval, limit, async {
            history
                .query_by_subject(&caller, &subject, history_limit)
                .await
                .map_err(ProviderError::from)
        })
        .await;
        let records = match records {
            Ok(r) => r,
            Err(e) => return self.fail(e.feature()),
        };

        if records.is_empty() {
            let known = match tokio::time::timeout(limit, providers.history.stats(&caller)).await {
                Ok(Ok(stats)) if !stats.per_subject.is_empty() => stats.subjects().join(", "),
                _ => "none".to_string(),
            };
            self.log(
                LogLevel::Info,
                format!("No history for {subject}; available subjects: {known}"),
            );
            self.transition(CallState::Welcome);
            return self.main_menu(
                vec![say(prompts::no_history(lang, &subject), lang)],
                Outcome::NoHistory,
            );
        }
        if !providers.generator.is_available() {
            return self.unavailable(Feature::Generation);
        }

        let pairs: Vec<QaPair> = records
            .iter()
            .map(|r| QaPair { question: r.question.clone(), answer: r.answer.clone() })
            .collect();
        let summary = match timed_stage(
            &bus,
            &call_id,
            Stage::AnswerGeneration,
            limit,
            providers.generator.summarize(&subject, &pairs),
        )
        .await
        {
            Ok(s) => s.trim().to_string(),
            Err(e) => return self.fail(e.feature()),
        };

        let audio =
            synthesize_or_fallback(&bus, &providers.synthesizer, &call_id, &summary, limit).await;
        let spoken = match audio {
            Some(a) => VoiceAction::Play { audio: a },
            None => say(summary, lang),
        };
        self.deliver(
            vec![
                say(prompts::summary_intro(lang, &subject, pairs.len()), lang),
                VoiceAction::Pause { secs: 1 },
                spoken,
            ],
            prompts::after_summary(lang),
        )
    }

    fn end_call(&mut self, goodbye: bool) -> Reply {
        let lang = self.lang();
        self.release();
        self.transition(CallState::Ended);
        self.publish(EventBody::CallLifecycle {
            call_id: self.session.id.clone(),
            phase: CallPhase::Ended,
            caller: Some(self.session.caller_address.clone()).filter(|c| !c.is_empty()),
        });
        self.shared.deregister(&self.session.id, self.actor_id);
        self.transition(CallState::Idle);
        self.ended = true;
        info!(target: "vani::orchestrator", call_id = %self.session.id, goodbye, "👋 call ended");

        let response = if goodbye {
            VoiceResponse::new().say(prompts::goodbye(lang), lang).hangup()
        } else {
            VoiceResponse::new().hangup()
        };
        Reply { response, state: CallState::Idle, outcome: Outcome::Ended }
    }
}
