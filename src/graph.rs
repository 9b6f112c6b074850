//! Rule/variable dependency analysis.
//!
//! Rules and the variables they reference form a bipartite graph. Its
//! connected components ("blocks") are independent sub-problems: no rule in
//! one block shares a variable with a rule in another, so blocks can be
//! confronted or debugged in isolation.

use std::collections::HashMap;

use crate::types::RuleSet;

/// One connected component of the rule/variable graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Rule names in rule-set order.
    pub rules: Vec<String>,
    /// Variables referenced by those rules, in first-appearance order.
    pub variables: Vec<String>,
}

/// Connected components of a rule set's bipartite rule/variable graph.
///
/// Blocks are numbered in order of their first rule; an unchanged rule set
/// always produces the same partition.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    blocks: Vec<Block>,
    rule_block: HashMap<String, usize>,
}

impl DependencyGraph {
    /// Compute the block partition of a rule set.
    #[must_use]
    pub fn build(set: &RuleSet) -> Self {
        let rules = set.rules();
        let mut parent: Vec<usize> = (0..rules.len()).collect();

        // union rules that share a variable
        let mut owner: HashMap<&str, usize> = HashMap::new();
        for (i, rule) in rules.iter().enumerate() {
            for variable in rule.variables() {
                match owner.get(variable.as_str()) {
                    Some(&j) => union(&mut parent, i, j),
                    None => {
                        owner.insert(variable, i);
                    }
                }
            }
        }

        let mut blocks: Vec<Block> = Vec::new();
        let mut root_block: HashMap<usize, usize> = HashMap::new();
        let mut rule_block = HashMap::new();
        for (i, rule) in rules.iter().enumerate() {
            let root = find(&mut parent, i);
            let index = *root_block.entry(root).or_insert_with(|| {
                blocks.push(Block {
                    rules: Vec::new(),
                    variables: Vec::new(),
                });
                blocks.len() - 1
            });
            let block = &mut blocks[index];
            block.rules.push(rule.name().to_owned());
            for variable in rule.variables() {
                if !block.variables.iter().any(|v| v == variable) {
                    block.variables.push(variable.clone());
                }
            }
            rule_block.insert(rule.name().to_owned(), index);
        }
        Self { blocks, rule_block }
    }

    /// The blocks, numbered in order of their first rule.
    #[must_use]
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// The block index of a rule, if the rule exists.
    #[must_use]
    pub fn block_of(&self, rule: &str) -> Option<usize> {
        self.rule_block.get(rule).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

fn find(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

fn union(parent: &mut [usize], a: usize, b: usize) {
    let (ra, rb) = (find(parent, a), find(parent, b));
    if ra != rb {
        // keep the smaller root so block numbering follows rule order
        let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
        parent[hi] = lo;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{var, RuleSetBuilder};

    #[test]
    fn shared_variable_links_rules() {
        let set = RuleSetBuilder::new()
            .rule("pos_a", |r| r.when(var("a").gt(0_i64)))
            .rule("pos_b", |r| r.when(var("b").gt(0_i64)))
            .rule("sum", |r| r.when((var("a") + var("b")).lt(10_i64)))
            .compile()
            .unwrap();
        let graph = DependencyGraph::build(&set);
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.blocks()[0].rules, ["pos_a", "pos_b", "sum"]);
        assert_eq!(graph.blocks()[0].variables, ["a", "b"]);
    }

    #[test]
    fn disjoint_rules_split_into_blocks() {
        let set = RuleSetBuilder::new()
            .rule("r1", |r| r.when(var("x").gt(0_i64)))
            .rule("r2", |r| r.when(var("y").gt(0_i64)))
            .rule("r3", |r| r.when(var("x").lt(100_i64)))
            .compile()
            .unwrap();
        let graph = DependencyGraph::build(&set);
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.blocks()[0].rules, ["r1", "r3"]);
        assert_eq!(graph.blocks()[1].rules, ["r2"]);
        assert_eq!(graph.block_of("r3"), Some(0));
        assert_eq!(graph.block_of("r2"), Some(1));
        assert_eq!(graph.block_of("missing"), None);
    }

    #[test]
    fn transitive_linking() {
        // a-b via r2, b-c via r3: all one block even though r1 and r4
        // share nothing directly
        let set = RuleSetBuilder::new()
            .rule("r1", |r| r.when(var("a").gt(0_i64)))
            .rule("r2", |r| r.when(var("a").lt(var("b"))))
            .rule("r3", |r| r.when(var("b").lt(var("c"))))
            .rule("r4", |r| r.when(var("c").gt(0_i64)))
            .compile()
            .unwrap();
        let graph = DependencyGraph::build(&set);
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn empty_set() {
        let set = RuleSetBuilder::new().compile().unwrap();
        let graph = DependencyGraph::build(&set);
        assert!(graph.is_empty());
    }
}
