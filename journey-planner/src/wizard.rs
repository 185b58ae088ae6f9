use chrono::{DateTime, Utc};
use icu_collator::{Collator, CollatorOptions};
use icu_locid::Locale;
use log::{info, warn};

use journey_model::{Category, CategoryId, Pin, PinId};

use crate::error::{ApiError, WizardError, PINS_FETCH_FAILED};
use crate::submit::{JourneyMetadata, JourneyPayload};
use crate::{Ticket, Tickets};

/// Where the journey-building flow currently is.
///
/// ```text
/// Idle -> CategoryBrowse <-> PinBrowse -> Confirming -> CategoryBrowse ...
///                                                    \-> AskContinue -> CategoryBrowse ...
///                                                                    \-> Finalizing -> Idle
/// ```
#[derive(Clone, Debug)]
pub enum Step {
    Idle,
    CategoryBrowse,
    PinBrowse {
        category: CategoryId,
        listing: Listing,
    },
    Confirming {
        category: CategoryId,
        // Kept so that answering "no" goes straight back to the same list
        pins: Vec<Pin>,
        pin: Pin,
    },
    AskContinue,
    Finalizing {
        submitting: Option<Ticket>,
    },
}

#[derive(Clone, Debug)]
pub enum Listing {
    Loading(Ticket),
    /// Filtered and sorted by title. May be empty.
    Ready(Vec<Pin>),
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::Idle => "idle",
            Step::CategoryBrowse => "browsing categories",
            Step::PinBrowse { .. } => "browsing pins",
            Step::Confirming { .. } => "confirming a pin",
            Step::AskContinue => "asking to continue",
            Step::Finalizing { .. } => "finalizing",
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Confirmation {
    Rejected,
    Added { ask_continue: bool },
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum SubmitOutcome {
    /// The draft is gone; anything listing routes should be refreshed.
    Saved,
    /// The draft is kept so the user can retry.
    Failed(String),
}

/// Sorts pin titles the way a speaker of the configured language expects.
pub struct TitleOrder {
    collator: Option<Collator>,
}

impl TitleOrder {
    pub fn new(locale: &str) -> Self {
        let collator = match locale.parse::<Locale>() {
            Ok(locale) => Collator::try_new(&locale.into(), CollatorOptions::new())
                .map_err(|err| err.to_string()),
            Err(err) => Err(err.to_string()),
        };
        match collator {
            Ok(collator) => Self {
                collator: Some(collator),
            },
            Err(err) => {
                warn!("No collation for {locale:?}, sorting by code point: {err}");
                Self { collator: None }
            }
        }
    }

    pub fn sort(&self, pins: &mut [Pin]) {
        match &self.collator {
            Some(collator) => pins.sort_by(|a, b| collator.compare(&a.title, &b.title)),
            None => pins.sort_by(|a, b| a.title.cmp(&b.title)),
        }
    }
}

/// One journey-building session. The ordered selection lives here and nowhere else.
pub struct Wizard {
    step: Step,
    selection: Vec<PinId>,
    notice: Option<String>,
    tickets: Tickets,
    order: TitleOrder,
    hide_expired: bool,
}

impl Wizard {
    pub fn new(order: TitleOrder, hide_expired: bool) -> Self {
        Self {
            step: Step::Idle,
            selection: Vec::new(),
            notice: None,
            tickets: Tickets::default(),
            order,
            hide_expired,
        }
    }

    pub fn step(&self) -> &Step {
        &self.step
    }

    pub fn selection(&self) -> &[PinId] {
        &self.selection
    }

    /// The 1-based position of the stop being chosen now.
    pub fn cursor(&self) -> usize {
        self.selection.len() + 1
    }

    pub fn prompt(&self) -> String {
        format!("{}つ目のルートを選択してください", self.cursor())
    }

    /// The last non-fatal problem to show the user, if any
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn is_active(&self) -> bool {
        !matches!(self.step, Step::Idle)
    }

    pub fn set_hide_expired(&mut self, hide_expired: bool) {
        self.hide_expired = hide_expired;
    }

    pub fn set_order(&mut self, order: TitleOrder) {
        self.order = order;
    }

    /// Starts a fresh session, discarding any old draft.
    pub fn open(&mut self) -> Result<(), WizardError> {
        self.ensure_not_submitting()?;
        self.reset();
        self.step = Step::CategoryBrowse;
        Ok(())
    }

    /// Discards the draft. Not allowed while a submission is in flight.
    pub fn cancel(&mut self) -> Result<(), WizardError> {
        self.ensure_not_submitting()?;
        self.reset();
        Ok(())
    }

    /// Starts loading the pins of one category. The caller fetches all pins and hands them to
    /// `pins_loaded` with the returned ticket.
    pub fn choose_category(&mut self, category: CategoryId) -> Result<Ticket, WizardError> {
        if !matches!(self.step, Step::CategoryBrowse | Step::PinBrowse { .. }) {
            return Err(self.wrong_step("choose a category"));
        }
        if Category::lookup(category).is_none() {
            return Err(WizardError::UnknownCategory(category.0));
        }
        let ticket = self.tickets.issue();
        self.notice = None;
        self.step = Step::PinBrowse {
            category,
            listing: Listing::Loading(ticket),
        };
        Ok(ticket)
    }

    pub fn back_to_categories(&mut self) -> Result<(), WizardError> {
        if !matches!(self.step, Step::PinBrowse { .. }) {
            return Err(self.wrong_step("go back to categories"));
        }
        self.step = Step::CategoryBrowse;
        Ok(())
    }

    /// Applies a finished pin fetch. Returns false if the response is for a listing that's no
    /// longer shown, in which case nothing changes.
    pub fn pins_loaded(
        &mut self,
        ticket: Ticket,
        result: Result<Vec<Pin>, ApiError>,
        now: DateTime<Utc>,
    ) -> bool {
        let category = match &self.step {
            Step::PinBrowse {
                category,
                listing: Listing::Loading(pending),
            } if *pending == ticket => *category,
            _ => {
                info!("Discarding stale pin list {ticket:?}");
                return false;
            }
        };

        match result {
            Ok(all) => {
                let mut pins: Vec<Pin> = all
                    .into_iter()
                    .filter(|p| p.category == category)
                    .filter(|p| !self.hide_expired || p.is_active(now))
                    .collect();
                self.order.sort(&mut pins);
                self.step = Step::PinBrowse {
                    category,
                    listing: Listing::Ready(pins),
                };
            }
            Err(err) => {
                warn!("Loading pins for the route failed: {err}");
                self.notice = Some(PINS_FETCH_FAILED.to_string());
                self.step = Step::CategoryBrowse;
            }
        }
        true
    }

    /// Shows one pin from the current list and asks whether to add it.
    pub fn select_pin(&mut self, id: PinId) -> Result<Pin, WizardError> {
        let Step::PinBrowse {
            category,
            listing: Listing::Ready(pins),
        } = &self.step
        else {
            return Err(self.wrong_step("select a pin"));
        };
        let pin = pins
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or(WizardError::UnknownPin(id))?;
        self.step = Step::Confirming {
            category: *category,
            pins: pins.clone(),
            pin: pin.clone(),
        };
        Ok(pin)
    }

    /// Answers the "add this place?" question.
    pub fn confirm(&mut self, yes: bool) -> Result<Confirmation, WizardError> {
        let step = std::mem::replace(&mut self.step, Step::CategoryBrowse);
        let Step::Confirming {
            category,
            pins,
            pin,
        } = step
        else {
            self.step = step;
            return Err(self.wrong_step("confirm a pin"));
        };

        if !yes {
            self.step = Step::PinBrowse {
                category,
                listing: Listing::Ready(pins),
            };
            return Ok(Confirmation::Rejected);
        }

        self.selection.push(pin.id);
        // Only offer to stop once there's a real journey of at least two stops
        let ask_continue = self.cursor() > 2;
        if ask_continue {
            self.step = Step::AskContinue;
        }
        Ok(Confirmation::Added { ask_continue })
    }

    pub fn continue_adding(&mut self) -> Result<(), WizardError> {
        if !matches!(self.step, Step::AskContinue) {
            return Err(self.wrong_step("continue adding"));
        }
        self.step = Step::CategoryBrowse;
        Ok(())
    }

    /// Closes pin selection and moves on to the journey form.
    pub fn stop_adding(&mut self) -> Result<(), WizardError> {
        if !matches!(self.step, Step::AskContinue) {
            return Err(self.wrong_step("stop adding"));
        }
        self.step = Step::Finalizing { submitting: None };
        Ok(())
    }

    /// Validates the draft and builds the request. Nothing is sent if the selection is empty.
    pub fn begin_submit(
        &mut self,
        metadata: JourneyMetadata,
    ) -> Result<(Ticket, JourneyPayload), WizardError> {
        match self.step {
            Step::Finalizing { submitting: None } => {}
            Step::Finalizing { submitting: Some(_) } => return Err(WizardError::Busy),
            _ => return Err(self.wrong_step("submit")),
        }
        if self.selection.is_empty() {
            self.notice = Some(WizardError::EmptySelection.user_message());
            return Err(WizardError::EmptySelection);
        }
        let ticket = self.tickets.issue();
        self.notice = None;
        self.step = Step::Finalizing {
            submitting: Some(ticket),
        };
        Ok((ticket, JourneyPayload::new(&self.selection, metadata)))
    }

    /// Applies the result of the create-route request. None means the ticket was stale.
    pub fn submit_finished(
        &mut self,
        ticket: Ticket,
        result: Result<(), ApiError>,
    ) -> Option<SubmitOutcome> {
        if !matches!(self.step, Step::Finalizing { submitting: Some(pending) } if pending == ticket)
        {
            info!("Discarding stale submission result {ticket:?}");
            return None;
        }
        match result {
            Ok(()) => {
                info!("Journey with {} pins saved", self.selection.len());
                self.reset();
                Some(SubmitOutcome::Saved)
            }
            Err(err) => {
                warn!("Saving journey failed: {err}");
                let msg = err.user_message();
                self.notice = Some(msg.clone());
                self.step = Step::Finalizing { submitting: None };
                Some(SubmitOutcome::Failed(msg))
            }
        }
    }

    fn reset(&mut self) {
        self.step = Step::Idle;
        self.selection.clear();
        self.notice = None;
    }

    fn ensure_not_submitting(&self) -> Result<(), WizardError> {
        if matches!(self.step, Step::Finalizing { submitting: Some(_) }) {
            return Err(WizardError::Busy);
        }
        Ok(())
    }

    fn wrong_step(&self, action: &'static str) -> WizardError {
        WizardError::WrongStep {
            action,
            step: self.step.name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_requires_a_pin() {
        let mut wizard = Wizard::new(TitleOrder::new("ja"), true);
        wizard.step = Step::Finalizing { submitting: None };

        assert_eq!(
            wizard
                .begin_submit(JourneyMetadata::named("日帰り旅"))
                .unwrap_err(),
            WizardError::EmptySelection
        );
        assert!(matches!(
            wizard.step,
            Step::Finalizing { submitting: None }
        ));
        assert_eq!(
            wizard.notice(),
            Some("少なくとも1つのピンを選択してください")
        );
    }

    #[test]
    fn test_unknown_locale_falls_back() {
        let order = TitleOrder::new("not a locale!");
        assert!(order.collator.is_none());
        let mut pins = vec![pin_titled("b"), pin_titled("B"), pin_titled("a")];
        order.sort(&mut pins);
        let titles: Vec<&str> = pins.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["B", "a", "b"]);

        let mut pins = vec![pin_titled("Banana"), pin_titled("apple")];
        TitleOrder::new("en").sort(&mut pins);
        assert_eq!(pins[0].title, "apple");
    }

    fn pin_titled(title: &str) -> Pin {
        Pin {
            id: PinId(1),
            lat: 0.0,
            lng: 0.0,
            title: title.to_string(),
            description: String::new(),
            category: CategoryId(1),
            image_url: None,
            caution: None,
            expires_at: None,
        }
    }
}
