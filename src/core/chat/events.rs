/// Events emitted by the streaming chat path. SSE framing happens in the
/// http layer; core code only deals in this enum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    /// A text fragment relayed from the model.
    TextDelta(String),
    /// Formatted resource recommendations appended after the answer.
    ResourceBlock(String),
    /// Low-quota notice for the user.
    Warning(String),
    /// In-band failure; always followed by `Done`.
    Error { message: String },
    /// Terminal marker. Every stream ends with exactly one.
    Done,
}
