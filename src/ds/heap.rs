//! Sentinel-guarded binary min-heap over a contiguous buffer.
//!
//! The buffer's slot 0 is reserved for an item carrying the `inf()` key.
//! Sift-up therefore terminates without a root bounds test: no real key
//! compares below the sentinel. The heap proper occupies slots `1..len`.
//!
//! ## Operations
//! - `make(buf)`: appends a copy of slot 0, installs the sentinel, heapifies
//! - `push(buf)`: bubbles the last element up past the sentinel
//! - `pop(buf)`: walks the min-path down, then bubbles the last element up
//!   from the hole; the caller truncates the buffer afterwards
//!
//! `pop` deliberately avoids the textbook sift-down: choosing the smaller
//! child with a branchless increment and refilling the hole from the tail
//! keeps the comparison outcomes predictable.
//!
//! Heap construction follows the `opt5` schedule from "Heap construction,
//! 50 years later" (Edelkamp, Elmasry, Katajainen).

use crate::traits::{QueueItem, QueueKey};

#[inline]
fn key_less<I: QueueItem>(a: &I, b: &I) -> bool {
    a.key() < b.key()
}

fn has_sentinel<I: QueueItem>(buf: &[I]) -> bool {
    !buf.is_empty() && buf[0].key() == I::Key::inf()
}

/// Returns the minimum item.
#[inline]
pub fn top<I: QueueItem>(buf: &[I]) -> &I {
    debug_assert!(has_sentinel(buf));
    &buf[1]
}

/// Returns the number of items, not counting the sentinel.
#[inline]
pub fn len<I: QueueItem>(buf: &[I]) -> usize {
    debug_assert!(has_sentinel(buf));
    buf.len() - 1
}

/// Returns `true` if the heap holds no items beyond the sentinel.
#[inline]
pub fn is_empty<I: QueueItem>(buf: &[I]) -> bool {
    len(buf) == 0
}

/// Turns a plain buffer into a sentinel-guarded heap.
///
/// Grows the buffer by one: a copy of the first element moves to the back
/// and slot 0 becomes the sentinel.
pub fn make<I: QueueItem>(buf: &mut Vec<I>) {
    assert!(!buf.is_empty());

    let first = buf[0].clone();
    buf.push(first);
    buf[0] = I::from_key(I::Key::inf());

    heapify(&mut buf[1..]);
}

/// Restores the heap after the caller appended one element at the back.
pub fn push<I: QueueItem>(buf: &mut [I]) {
    debug_assert!(has_sentinel(buf));
    let last = buf.len() - 1;
    bubble_up_last_from(buf, last);
}

/// Removes the minimum. The last slot is left in an unspecified state; the
/// caller shrinks the buffer by one.
pub fn pop<I: QueueItem>(buf: &mut [I]) {
    debug_assert!(has_sentinel(buf));
    let max_idx = buf.len() - 1;
    debug_assert!(max_idx > 0);

    // move elements up along a min-path
    let mut hole = 1;
    let mut succ = 2;
    while succ < max_idx {
        succ += usize::from(key_less(&buf[succ + 1], &buf[succ]));
        buf[hole] = buf[succ].clone();
        hole = succ;
        succ <<= 1;
    }

    // then bubble up the rightmost element
    bubble_up_last_from(buf, hole);
}

// Bubbles the last element of `buf` up from `hole`. Terminates at the
// sentinel without an explicit root test.
fn bubble_up_last_from<I: QueueItem>(buf: &mut [I], mut hole: usize) {
    let el = buf[buf.len() - 1].clone();

    let mut pred = hole >> 1;
    while key_less(&el, &buf[pred]) {
        buf[hole] = buf[pred].clone();
        hole = pred;
        pred >>= 1;
    }

    buf[hole] = el;
}

// `opt5` bottom-up construction over `a` (no sentinel; 0-based children at
// 2i+1 / 2i+2). Processes internal nodes right to left, reusing the hole of
// the previous node, and fixes the last element with a final sift-up.
fn heapify<I: QueueItem>(a: &mut [I]) {
    let n = a.len();
    if n < 2 {
        return;
    }
    if n == 2 {
        if key_less(&a[1], &a[0]) {
            a.swap(0, 1);
        }
        return;
    }

    let m = if n & 1 == 1 { n } else { n - 1 };
    let mut i = (m - 2) / 2;
    let mut j = i;
    let mut hole = j;
    let mut current = a[j].clone();
    loop {
        if i == j {
            hole = j;
            current = a[j].clone();
        }

        j = 2 * j + 1;
        j += usize::from(key_less(&a[j + 1], &a[j]));
        a[hole] = a[j].clone();
        hole = if key_less(&a[j], &current) { j } else { hole };

        if 2 * j + 1 >= m {
            a[hole] = current.clone();
            if i == 0 {
                break;
            }
            i -= 1;
            j = i;
        }
    }
    sift_up(a, n - 1);
}

fn sift_up<I: QueueItem>(a: &mut [I], mut j: usize) {
    let current = a[j].clone();
    while j > 0 {
        let i = (j - 1) / 2;
        if !key_less(&current, &a[i]) {
            break;
        }
        a[j] = a[i].clone();
        j = i;
    }
    a[j] = current;
}
