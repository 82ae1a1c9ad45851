//! Correlation id generation.

/// Upper-case letters and digits without vowels, so ids never spell words.
const ID_ALPHABET: [char; 31] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'B', 'C', 'D', 'F', 'G', 'H', 'J', 'K', 'L',
    'M', 'N', 'P', 'Q', 'R', 'S', 'T', 'V', 'W', 'X', 'Y', 'Z',
];

/// Length of generated correlation ids, roughly 119 bits of randomness.
pub const CORRELATION_ID_LENGTH: usize = 24;

/// A fresh request or trace id for a request which did not bring one.
pub fn correlation_id() -> String {
    nanoid::format(nanoid::rngs::default, &ID_ALPHABET, CORRELATION_ID_LENGTH)
}
