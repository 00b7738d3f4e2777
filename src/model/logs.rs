use serde::Serialize;

/// One line of the agent's operational log, as held by the broadcast hub.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LogLine {
    /// Strictly increasing, starting at 1.
    pub sequence: u64,
    /// Already carries its timestamp prefix.
    pub text: String,
}
