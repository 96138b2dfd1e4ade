//! Scripted speech engine — a `SpeechEngine` whose events are raised by the
//! test instead of a platform synthesizer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use taleweave_core::error::DomainError;
use taleweave_core::speech::{
    EngineEvent, EngineEventSink, SpeechEngine, Utterance, UtteranceUpdate, Voice,
};
use uuid::Uuid;

/// A call received by `ScriptedSpeechEngine`.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    /// `speak` with the utterance id.
    Speak(Uuid),
    /// `pause`.
    Pause,
    /// `resume`.
    Resume,
    /// `cancel`.
    Cancel,
    /// `update` with the utterance id and change.
    Update(Uuid, UtteranceUpdate),
}

/// A speech engine that records calls and emits events on demand.
#[derive(Debug)]
pub struct ScriptedSpeechEngine {
    sink: Mutex<Option<EngineEventSink>>,
    voices: Mutex<Vec<Voice>>,
    spoken: Mutex<Vec<Utterance>>,
    calls: Mutex<Vec<EngineCall>>,
    live_updates: bool,
    reject_speak: AtomicBool,
}

impl ScriptedSpeechEngine {
    /// Creates an engine offering `voices` that supports live updates.
    #[must_use]
    pub fn new(voices: Vec<Voice>) -> Self {
        Self {
            sink: Mutex::new(None),
            voices: Mutex::new(voices),
            spoken: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            live_updates: true,
            reject_speak: AtomicBool::new(false),
        }
    }

    /// Creates an engine that cannot change utterances in flight.
    #[must_use]
    pub fn without_live_updates(voices: Vec<Voice>) -> Self {
        Self {
            live_updates: false,
            ..Self::new(voices)
        }
    }

    /// Makes every subsequent `speak` call fail.
    pub fn reject_speak(&self) {
        self.reject_speak.store(true, Ordering::SeqCst);
    }

    /// Utterances handed to `speak`, in call order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn spoken(&self) -> Vec<Utterance> {
        self.spoken.lock().unwrap().clone()
    }

    /// Every call received, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Raises `EngineEvent::Started`.
    pub fn emit_started(&self, utterance: Uuid) {
        self.emit(EngineEvent::Started(utterance));
    }

    /// Raises `EngineEvent::Ended`.
    pub fn emit_ended(&self, utterance: Uuid) {
        self.emit(EngineEvent::Ended(utterance));
    }

    /// Raises `EngineEvent::Failed`.
    pub fn emit_failed(&self, utterance: Uuid, detail: &str) {
        self.emit(EngineEvent::Failed {
            utterance,
            detail: detail.to_owned(),
        });
    }

    /// Replaces the voice list and raises `EngineEvent::VoicesChanged`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn announce_voices(&self, voices: Vec<Voice>) {
        *self.voices.lock().unwrap() = voices;
        self.emit(EngineEvent::VoicesChanged);
    }

    fn emit(&self, event: EngineEvent) {
        if let Some(sink) = self.sink.lock().unwrap().as_ref() {
            let _ = sink.send(event);
        }
    }
}

impl SpeechEngine for ScriptedSpeechEngine {
    fn attach(&self, sink: EngineEventSink) {
        *self.sink.lock().unwrap() = Some(sink);
    }

    fn voices(&self) -> Vec<Voice> {
        self.voices.lock().unwrap().clone()
    }

    fn speak(&self, utterance: Utterance) -> Result<(), DomainError> {
        self.calls.lock().unwrap().push(EngineCall::Speak(utterance.id));
        if self.reject_speak.load(Ordering::SeqCst) {
            return Err(DomainError::SpeechEngine("synthesis-failed".into()));
        }
        self.spoken.lock().unwrap().push(utterance);
        Ok(())
    }

    fn pause(&self) {
        self.calls.lock().unwrap().push(EngineCall::Pause);
    }

    fn resume(&self) {
        self.calls.lock().unwrap().push(EngineCall::Resume);
    }

    fn cancel(&self) {
        self.calls.lock().unwrap().push(EngineCall::Cancel);
    }

    fn update(&self, utterance: Uuid, update: UtteranceUpdate) -> bool {
        self.calls
            .lock()
            .unwrap()
            .push(EngineCall::Update(utterance, update));
        self.live_updates
    }
}
