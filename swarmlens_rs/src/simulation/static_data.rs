//! Structures rendered as a single snapshot rather than a frame sequence.

use serde_json::{Value, json};

use super::Counters;

pub const DEFAULT_TREE_KEYS: [i64; 7] = [50, 30, 70, 20, 40, 60, 80];
pub const DEFAULT_ARRAY: [i64; 5] = [10, 20, 30, 40, 50];

#[derive(Debug)]
struct Node {
    value: i64,
    left: Option<Box<Node>>,
    right: Option<Box<Node>>,
}

impl Node {
    fn insert(slot: &mut Option<Box<Node>>, value: i64, counters: &mut Counters) {
        match slot {
            None => {
                *slot = Some(Box::new(Node {
                    value,
                    left: None,
                    right: None,
                }));
            }
            Some(node) => {
                counters.comparisons += 1;
                if value < node.value {
                    Self::insert(&mut node.left, value, counters);
                } else {
                    Self::insert(&mut node.right, value, counters);
                }
            }
        }
    }

    fn to_json(node: &Option<Box<Node>>) -> Value {
        match node {
            None => Value::Null,
            Some(n) => json!({
                "value": n.value,
                "left": Self::to_json(&n.left),
                "right": Self::to_json(&n.right),
            }),
        }
    }

    fn in_order(node: &Option<Box<Node>>, out: &mut Vec<i64>) {
        if let Some(n) = node {
            Self::in_order(&n.left, out);
            out.push(n.value);
            Self::in_order(&n.right, out);
        }
    }

    fn height(node: &Option<Box<Node>>) -> usize {
        node.as_ref()
            .map_or(0, |n| 1 + Self::height(&n.left).max(Self::height(&n.right)))
    }
}

/// Binary search tree built by inserting the keys in order.
pub(super) fn tree(keys: Option<&[i64]>, counters: &mut Counters) -> (Value, String) {
    let keys = keys.unwrap_or(&DEFAULT_TREE_KEYS);
    let mut root: Option<Box<Node>> = None;
    for key in keys {
        Node::insert(&mut root, *key, counters);
    }
    let mut ordered = Vec::with_capacity(keys.len());
    Node::in_order(&root, &mut ordered);
    let sample = json!({
        "root": Node::to_json(&root),
        "in_order": ordered,
        "height": Node::height(&root),
        "size": keys.len(),
    });
    (sample, "Binary tree structure detected".to_string())
}

pub(super) fn array(values: Option<&[i64]>) -> (Value, String) {
    let values = values.unwrap_or(&DEFAULT_ARRAY);
    let sample = json!({
        "values": values,
        "length": values.len(),
    });
    (sample, "Array structure detected".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tree_shape() {
        let mut counters = Counters::default();
        let (sample, message) = tree(None, &mut counters);
        assert_eq!(sample["root"]["value"], 50);
        assert_eq!(sample["root"]["left"]["value"], 30);
        assert_eq!(sample["root"]["right"]["value"], 70);
        assert_eq!(sample["root"]["left"]["left"]["value"], 20);
        assert_eq!(sample["root"]["left"]["right"]["value"], 40);
        assert_eq!(sample["root"]["right"]["left"]["value"], 60);
        assert_eq!(sample["root"]["right"]["right"]["value"], 80);
        assert_eq!(sample["height"], 3);
        assert_eq!(sample["in_order"], json!([20, 30, 40, 50, 60, 70, 80]));
        assert!(message.contains("tree"));
        // 0 + 1 + 1 + 2 + 2 + 2 + 2
        assert_eq!(counters.comparisons, 10);
    }

    #[test]
    fn default_array() {
        let (sample, _) = array(None);
        assert_eq!(sample["values"], json!([10, 20, 30, 40, 50]));
        assert_eq!(sample["length"], 5);
    }
}
