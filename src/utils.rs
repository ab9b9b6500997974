//! Shared low-level helpers.
//!
//! Currently holds the cyclic rotation primitive used by both the cipher
//! rounds (message rotation) and the table scramble (whole-table rotation).

/// Cyclically rotates `data` in place by `offset` positions.
///
/// A positive offset is a left rotation: the element at old index
/// `(i + offset) % len` moves to index `i`. Negative offsets are normalized
/// as `(len - 1) - ((-offset - 1) % len)` before applying the same left
/// rotation. This exact normalization makes `rotate(s, o)` and
/// `rotate(s, -o)` inverses for every `o`; a plain `(-offset) % len`
/// does not, and must not be substituted.
///
/// Offsets of any magnitude are accepted; they are reduced modulo the
/// length. Empty slices are left untouched.
pub(crate) fn rotate<T: Copy>(data: &mut [T], offset: i64) {
    let len = data.len();
    if len == 0 {
        return;
    }
    let len_i = len as i64;
    let reduced = if offset < 0 {
        (len_i - 1) - ((-offset - 1) % len_i)
    } else {
        offset % len_i
    };
    if reduced == 0 {
        return;
    }
    data.rotate_left(reduced as usize);
}
