/// How many bytes of a `chunk_len`-byte chunk fit under the ceiling.
///
/// `written` is what has already been staged. The result is `0` once the
/// ceiling is reached, which is the reader's signal to stop polling.
///
/// # Examples
///
/// ```
/// use trove_fetch::admit;
///
/// assert_eq!(admit(10, 0, 96), 10);
/// assert_eq!(admit(10, 90, 96), 6);
/// assert_eq!(admit(10, 96, 96), 0);
/// ```
pub fn admit(chunk_len: usize, written: u64, required: u64) -> usize {
    let remaining = required.saturating_sub(written);
    match usize::try_from(remaining) {
        Ok(remaining) => chunk_len.min(remaining),
        Err(_) => chunk_len,
    }
}
