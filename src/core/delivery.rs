//! Question delivery state machine.
//!
//! The interview flow asks for the next question by setting the
//! acknowledgement attribute (via DTMF) on the contact. The machine is a
//! pure transition function over that observed signal; the loop around it
//! executes the resulting effects against the telephony gateway. Keeping
//! the transition pure means the protocol can be driven by an injected
//! fake signal source in tests.
//!
//! Question #1 is spoken as part of the opening prompt, so the machine
//! starts with its cursor past it. A transition is only committed once the
//! prompt write lands: on a failed write the acknowledgement stays set and
//! the same transition re-triggers on the next tick.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::adapters::{TelephonyGateway, ATTR_PROMPT, ATTR_USER_RESPONSE};

/// Spoken after the last question has been delivered, right before hangup.
pub const FAREWELL_MESSAGE: &str = "Excelente, hemos terminado con todas las preguntas. \
    Muchas gracias por tu tiempo y por compartir tu conocimiento con nosotros. \
    ¡Que tengas un excelente día!";

/// The acknowledgement signal observed on a poll tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckSignal {
    /// The interviewee is ready for the next question
    Ready,

    /// No acknowledgement yet (also the case when the attribute read failed)
    None,
}

/// Where the machine is in the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryState {
    /// Waiting for the acknowledgement that unlocks `questions[cursor]`
    AwaitingAck { cursor: usize },

    /// Every queued question has been delivered
    Exhausted,
}

/// Side effects a transition asks the loop to perform, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Write the next question into the prompt attribute
    SendPrompt { text: String },

    /// Clear the acknowledgement attribute so a stale read cannot re-trigger
    ClearAck,

    /// Speak the farewell and stop the contact
    Farewell { message: String },
}

/// A planned state change plus the effects that realize it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub next: DeliveryState,
    pub effects: Vec<Effect>,
}

/// Pure state machine over the question queue.
#[derive(Debug, Clone)]
pub struct DeliveryMachine {
    questions: Vec<String>,
    state: DeliveryState,
    sent: usize,
}

impl DeliveryMachine {
    /// Create a machine for a queue whose first question already went out
    /// with the opening prompt.
    pub fn new(questions: Vec<String>) -> Self {
        let state = if questions.len() <= 1 {
            DeliveryState::Exhausted
        } else {
            DeliveryState::AwaitingAck { cursor: 1 }
        };

        Self {
            questions,
            state,
            sent: 0,
        }
    }

    pub fn state(&self) -> DeliveryState {
        self.state
    }

    /// Questions delivered by the loop (the opening question is not counted).
    pub fn questions_sent(&self) -> usize {
        self.sent
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self.state, DeliveryState::Exhausted)
    }

    /// Pure transition: what should happen given the observed signal.
    /// Produces no effects until an acknowledgement is seen.
    pub fn plan(&self, signal: AckSignal) -> Transition {
        match (self.state, signal) {
            (DeliveryState::Exhausted, _) | (_, AckSignal::None) => Transition {
                next: self.state,
                effects: Vec::new(),
            },
            (DeliveryState::AwaitingAck { cursor }, AckSignal::Ready) => {
                let text = self.questions[cursor].clone();
                let last = cursor + 1 >= self.questions.len();

                let mut effects = vec![Effect::SendPrompt { text }, Effect::ClearAck];
                let next = if last {
                    effects.push(Effect::Farewell {
                        message: FAREWELL_MESSAGE.to_string(),
                    });
                    DeliveryState::Exhausted
                } else {
                    DeliveryState::AwaitingAck { cursor: cursor + 1 }
                };

                Transition { next, effects }
            }
        }
    }

    /// Commit a planned transition after its prompt write succeeded.
    pub fn commit(&mut self, next: DeliveryState) {
        self.state = next;
        self.sent += 1;
    }
}

/// Timing knobs for the delivery loop.
#[derive(Debug, Clone)]
pub struct DeliveryTiming {
    /// Wall-clock budget for the whole loop
    pub ceiling: Duration,

    /// Sleep between poll ticks
    pub poll_interval: Duration,

    /// Pause between the farewell prompt write and stopping the contact,
    /// so the flow gets to speak it
    pub farewell_hold: Duration,
}

/// What the delivery loop achieved.
#[derive(Debug, Clone)]
pub struct DeliveryOutcome {
    /// True when the queue was exhausted before the ceiling
    pub success: bool,

    /// True when the ceiling expired with questions still queued
    pub timed_out: bool,

    /// Questions delivered by the loop
    pub questions_sent: usize,

    /// Queue length, opening question included
    pub total_questions: usize,

    pub elapsed: Duration,

    /// Whether the farewell was spoken and the contact stopped by the loop
    pub farewell_sent: bool,

    pub message: String,
}

/// Drive the state machine against the gateway until the queue is exhausted
/// or the wall-clock ceiling expires. Ceilings are checked between ticks, so
/// the loop can overshoot by up to one poll interval.
///
/// Attribute read failures surface as empty maps and count as "no ack yet";
/// a failed platform call never aborts the loop. On ceiling expiry the call
/// is left up for the controller to terminate explicitly.
pub async fn run_delivery_loop(
    gateway: &dyn TelephonyGateway,
    contact_id: &str,
    questions: &[String],
    timing: &DeliveryTiming,
) -> DeliveryOutcome {
    let mut machine = DeliveryMachine::new(questions.to_vec());
    let start = Instant::now();
    let mut farewell_sent = false;

    info!(
        contact_id,
        total = questions.len(),
        ceiling_secs = timing.ceiling.as_secs(),
        "Starting question delivery loop"
    );

    while !machine.is_exhausted() && start.elapsed() < timing.ceiling {
        let attributes = gateway.read_attributes(contact_id).await;
        let signal = match attributes.get(ATTR_USER_RESPONSE) {
            Some(value) if !value.is_empty() => AckSignal::Ready,
            _ => AckSignal::None,
        };

        let transition = machine.plan(signal);
        if transition.effects.is_empty() {
            debug!(contact_id, "No acknowledgement yet");
            tokio::time::sleep(timing.poll_interval).await;
            continue;
        }

        let mut committed = false;
        for effect in &transition.effects {
            match effect {
                Effect::SendPrompt { text } => {
                    if gateway.write_attribute(contact_id, ATTR_PROMPT, text).await {
                        machine.commit(transition.next);
                        committed = true;
                        info!(
                            contact_id,
                            sent = machine.questions_sent(),
                            "Question delivered"
                        );
                    } else {
                        warn!(contact_id, "Prompt write failed; retrying on next tick");
                        break;
                    }
                }
                Effect::ClearAck => {
                    if !gateway
                        .write_attribute(contact_id, ATTR_USER_RESPONSE, "")
                        .await
                    {
                        warn!(contact_id, "Could not clear acknowledgement attribute");
                    }
                }
                Effect::Farewell { message } => {
                    farewell_sent =
                        send_farewell(gateway, contact_id, message, timing.farewell_hold).await;
                }
            }
        }

        if !committed || !machine.is_exhausted() {
            tokio::time::sleep(timing.poll_interval).await;
        }
    }

    let elapsed = start.elapsed();
    let success = machine.is_exhausted();
    let timed_out = !success;
    let sent = machine.questions_sent();

    let message = if success {
        format!(
            "Entrevista completada. Todas las preguntas enviadas ({} por el bucle)",
            sent
        )
    } else {
        format!(
            "Tiempo máximo alcanzado. Enviadas {} de {} preguntas",
            sent,
            questions.len()
        )
    };

    info!(contact_id, %message, "Delivery loop finished");

    DeliveryOutcome {
        success,
        timed_out,
        questions_sent: sent,
        total_questions: questions.len(),
        elapsed,
        farewell_sent,
        message,
    }
}

/// Speak the farewell, hold long enough for the flow to play it, then stop
/// the contact. Best-effort: a failure here never undoes the delivery.
async fn send_farewell(
    gateway: &dyn TelephonyGateway,
    contact_id: &str,
    message: &str,
    hold: Duration,
) -> bool {
    if !gateway
        .write_attribute(contact_id, ATTR_PROMPT, message)
        .await
    {
        warn!(contact_id, "Could not deliver farewell message");
        return false;
    }

    tokio::time::sleep(hold).await;

    let stopped = gateway.terminate(contact_id).await;
    if stopped {
        info!(contact_id, "Farewell delivered and contact stopped");
    } else {
        warn!(contact_id, "Farewell delivered but contact could not be stopped");
    }
    stopped
}
