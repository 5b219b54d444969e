//! Huffman coding over word counts
//!
//! Leaves are the vocabulary entries; the `n - 1` internal nodes are
//! numbered `0..n-1` in creation order, the root being `n - 2`. Internal
//! node numbers index rows of the hierarchical-softmax output matrix.

/// Code of one leaf: `path[i]` is the internal node visited at depth `i`
/// (root first), `code[i]` the branch taken below it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HuffmanCode {
    pub code: Vec<u8>,
    pub path: Vec<u32>,
}

/// Build Huffman codes for counts sorted in non-increasing order.
///
/// The two lowest-count nodes are merged repeatedly. Leaves and internal
/// nodes are each consumed in order from their own queue, and on equal
/// counts the leaf (inserted earlier) is taken first, which makes the tree
/// a pure function of the count sequence.
pub fn build(counts: &[u64]) -> Vec<HuffmanCode> {
    let n = counts.len();
    if n <= 1 {
        return vec![HuffmanCode::default(); n];
    }

    let mut weight = vec![u64::MAX; 2 * n - 1];
    weight[..n].copy_from_slice(counts);
    let mut parent = vec![0usize; 2 * n - 1];
    let mut branch = vec![0u8; 2 * n - 1];

    // `leaf` walks down from the rarest word, `node` walks up the internal queue.
    let mut leaf = n;
    let mut node = n;
    for a in 0..n - 1 {
        let mut pick = || {
            if leaf > 0 && weight[leaf - 1] <= weight[node] {
                leaf -= 1;
                leaf
            } else {
                node += 1;
                node - 1
            }
        };
        let min1 = pick();
        let min2 = pick();

        weight[n + a] = weight[min1].saturating_add(weight[min2]);
        parent[min1] = n + a;
        parent[min2] = n + a;
        branch[min2] = 1;
    }

    let root = 2 * n - 2;
    (0..n)
        .map(|word| {
            let mut code = Vec::new();
            let mut path = Vec::new();
            let mut b = word;
            while b != root {
                code.push(branch[b]);
                path.push((parent[b] - n) as u32);
                b = parent[b];
            }
            code.reverse();
            path.reverse();
            HuffmanCode { code, path }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn is_prefix(a: &[u8], b: &[u8]) -> bool {
        a.len() <= b.len() && &b[..a.len()] == a
    }

    #[test]
    fn single_word_has_empty_code() {
        assert_eq!(build(&[42]), vec![HuffmanCode::default()]);
        assert!(build(&[]).is_empty());
    }

    #[test]
    fn two_words() {
        let codes = build(&[10, 3]);
        assert_eq!(codes[0].code.len(), 1);
        assert_eq!(codes[1].code.len(), 1);
        assert_ne!(codes[0].code, codes[1].code);
        assert_eq!(codes[0].path, vec![0]);
        assert_eq!(codes[1].path, vec![0]);
    }

    #[test]
    fn textbook_example() {
        // Classic frequencies: a=45 b=13 c=12 d=16 e=9 f=5, sorted descending.
        let counts = [45, 16, 13, 12, 9, 5];
        let codes = build(&counts);
        let lengths: Vec<usize> = codes.iter().map(|c| c.code.len()).collect();
        assert_eq!(lengths, vec![1, 3, 3, 3, 4, 4]);
        let cost: u64 = counts
            .iter()
            .zip(&lengths)
            .map(|(c, l)| c * *l as u64)
            .sum();
        assert_eq!(cost, 224);
    }

    #[test]
    fn root_is_first_on_every_path() {
        let codes = build(&[9, 7, 5, 3, 2, 1]);
        let root = (codes.len() - 2) as u32;
        for c in &codes {
            assert_eq!(c.path[0], root);
            assert_eq!(c.path.len(), c.code.len());
        }
    }

    fn sorted_counts() -> impl Strategy<Value = Vec<u64>> {
        prop::collection::vec(1u64..10_000, 1..200).prop_map(|mut v| {
            v.sort_unstable_by(|a, b| b.cmp(a));
            v
        })
    }

    proptest! {
        #[test]
        fn codes_are_prefix_free(counts in sorted_counts()) {
            let codes = build(&counts);
            for i in 0..codes.len() {
                for j in 0..codes.len() {
                    if i != j {
                        prop_assert!(!is_prefix(&codes[i].code, &codes[j].code));
                    }
                }
            }
        }

        #[test]
        fn frequent_words_get_shorter_codes(counts in sorted_counts()) {
            let codes = build(&counts);
            for i in 0..counts.len() {
                for j in i + 1..counts.len() {
                    if counts[i] > counts[j] {
                        prop_assert!(codes[i].code.len() <= codes[j].code.len());
                    }
                }
            }
        }

        #[test]
        fn internal_nodes_are_in_range(counts in sorted_counts()) {
            let n = counts.len();
            for c in build(&counts) {
                prop_assert!(c.path.iter().all(|&p| (p as usize) < n.saturating_sub(1).max(1)));
            }
        }
    }
}
