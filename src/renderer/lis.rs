//! Longest increasing subsequence.
//!
//! Used by the keyed diff: the input holds, for each new position, the old
//! position + 1 of the node matched there (0 = freshly mounted). Nodes on the
//! longest strictly increasing run of old positions can stay where they are;
//! everything else is moved.

/// Indices (ascending) of one longest strictly increasing subsequence of
/// `values`, ignoring zeros.
///
/// Patience sorting with back-pointers: `result[k]` is the index of the
/// smallest tail of any increasing run of length `k + 1` seen so far.
pub fn longest_increasing_subsequence(values: &[usize]) -> Vec<usize> {
    let mut predecessors = vec![0usize; values.len()];
    let mut result: Vec<usize> = Vec::new();

    for (i, &value) in values.iter().enumerate() {
        if value == 0 {
            continue;
        }
        match result.last() {
            None => {
                result.push(i);
                continue;
            }
            Some(&last) if values[last] < value => {
                predecessors[i] = last;
                result.push(i);
                continue;
            }
            Some(_) => {}
        }

        // first tail whose value is >= value; exists because the last one is
        let pos = result.partition_point(|&r| values[r] < value);
        if value < values[result[pos]] {
            if pos > 0 {
                predecessors[i] = result[pos - 1];
            }
            result[pos] = i;
        }
    }

    let Some(&last) = result.last() else {
        return result;
    };
    let mut cursor = last;
    for slot in result.iter_mut().rev() {
        *slot = cursor;
        cursor = predecessors[cursor];
    }
    result
}
