use throbber_widgets_tui::ThrobberState;

/// Region that receives unbound keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Focus {
    Tree,
    #[default]
    QueryInput,
    ResultView,
}

impl Focus {
    pub fn label(&self) -> &'static str {
        match self {
            Focus::Tree => "TREE",
            Focus::QueryInput => "QUERY",
            Focus::ResultView => "RESULT",
        }
    }
}

/// Count of background operations still running, plus the spinner that shows it.
#[derive(Debug, Default)]
pub struct Activity {
    in_flight: usize,
    started: u64,
    stopped: u64,
    throbber: ThrobberState,
}

impl Activity {
    pub fn start(&mut self) {
        self.in_flight += 1;
        self.started += 1;
    }

    pub fn stop(&mut self) {
        self.in_flight = self.in_flight.saturating_sub(1);
        self.stopped += 1;
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight > 0
    }

    /// Total starts since launch.
    pub fn started(&self) -> u64 {
        self.started
    }

    /// Total stops since launch.
    pub fn stopped(&self) -> u64 {
        self.stopped
    }

    /// Advances the spinner; called once per frame while busy.
    pub fn tick(&mut self) {
        if self.is_busy() {
            self.throbber.calc_next();
        }
    }

    pub fn throbber(&self) -> &ThrobberState {
        &self.throbber
    }
}
