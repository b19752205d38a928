use crate::queued::{InstructionId, InstructionStatus, QueuedInstruction};
use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Instant;
use taskcore_types::ResourceKey;

/// SCH's admission state: which resource keys are currently held by
/// `active` instructions, and the concurrency ceiling (§4.F).
pub struct Scheduler {
    active_resources: HashSet<ResourceKey>,
    max_concurrency: usize,
}

impl Scheduler {
    pub fn new(max_concurrency: usize) -> Self {
        Self {
            active_resources: HashSet::new(),
            max_concurrency,
        }
    }

    /// Admit as many `pending` candidates into `active` as resource
    /// hazards and `max_concurrency` allow, in priority order (ties broken
    /// FIFO) (§4.F).
    ///
    /// I1: `active_resources` is updated the instant a candidate issues,
    /// before the next candidate is considered, so two candidates sharing
    /// a key can never both issue in this call. A single forward scan
    /// already gives this — within one call `active_resources` only grows,
    /// so a second scan could never admit anything the first one skipped.
    pub fn admit(&mut self, pending: &mut VecDeque<QueuedInstruction>, active: &mut HashMap<InstructionId, QueuedInstruction>, priority_of: impl Fn(&str) -> i32) -> Vec<InstructionId> {
        let mut order: Vec<usize> = (0..pending.len()).collect();
        order.sort_by_key(|&i| std::cmp::Reverse(priority_of(&pending[i].instruction_type)));

        let mut to_issue: Vec<usize> = Vec::new();
        let mut in_flight = active.len();

        for idx in order {
            if in_flight >= self.max_concurrency {
                break;
            }
            let candidate = &pending[idx];
            let conflicts = candidate.resource_keys.iter().any(|k| self.active_resources.contains(k));
            if conflicts {
                continue;
            }
            for key in &candidate.resource_keys {
                self.active_resources.insert(key.clone());
            }
            to_issue.push(idx);
            in_flight += 1;
        }

        // Remove highest index first so earlier indices stay valid.
        to_issue.sort_unstable_by(|a, b| b.cmp(a));
        let mut issued_ids = Vec::with_capacity(to_issue.len());
        for idx in to_issue {
            let mut instruction = pending.remove(idx).expect("index came from this deque");
            instruction.status = InstructionStatus::Issued;
            instruction.timestamps.sch_at = Some(Instant::now());
            issued_ids.push(instruction.id);
            active.insert(instruction.id, instruction);
        }
        issued_ids.reverse();
        issued_ids
    }

    /// Release the resource keys an instruction held, called by WB after
    /// (if applicable) its revert has completed (§4.F ordering guarantee).
    pub fn release(&mut self, keys: &[ResourceKey]) {
        for key in keys {
            self.active_resources.remove(key);
        }
    }

    #[cfg(test)]
    pub fn active_resource_count(&self) -> usize {
        self.active_resources.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use taskcore_types::CorrelationId;
    use tokio::sync::oneshot;

    fn instr(id: InstructionId, keys: &[&str]) -> QueuedInstruction {
        let (tx, _rx) = oneshot::channel();
        let mut q = QueuedInstruction::new(id, "task.update".to_string(), json!({}), CorrelationId::allocate(), tx);
        q.resource_keys = keys.iter().map(|k| ResourceKey::new(*k)).collect();
        q
    }

    #[test]
    fn conflicting_instructions_serialize_across_admission_calls() {
        let mut scheduler = Scheduler::new(10);
        let mut pending = VecDeque::new();
        pending.push_back(instr(1, &["task:t1"]));
        pending.push_back(instr(2, &["task:t1"]));
        let mut active = HashMap::new();

        let issued = scheduler.admit(&mut pending, &mut active, |_| 0);
        assert_eq!(issued, vec![1]);
        assert_eq!(pending.len(), 1, "the conflicting instruction stays pending");

        scheduler.release(&[ResourceKey::new("task:t1")]);
        active.remove(&1);
        let issued = scheduler.admit(&mut pending, &mut active, |_| 0);
        assert_eq!(issued, vec![2]);
    }

    #[test]
    fn disjoint_instructions_issue_together_up_to_concurrency_limit() {
        let mut scheduler = Scheduler::new(1);
        let mut pending = VecDeque::new();
        pending.push_back(instr(1, &["task:t1"]));
        pending.push_back(instr(2, &["task:t2"]));
        let mut active = HashMap::new();

        let issued = scheduler.admit(&mut pending, &mut active, |_| 0);
        assert_eq!(issued, vec![1]);
        assert_eq!(pending.len(), 1, "max_concurrency=1 holds back the second, even though disjoint");
    }

    #[test]
    fn later_non_conflicting_instruction_overtakes_an_earlier_blocked_one() {
        let mut scheduler = Scheduler::new(10);
        let mut pending = VecDeque::new();
        pending.push_back(instr(1, &["task:t1"]));
        pending.push_back(instr(2, &["task:t2"]));
        let mut active = HashMap::new();
        active.insert(99, instr(99, &["task:t1"]));
        scheduler.active_resources.insert(ResourceKey::new("task:t1"));

        let issued = scheduler.admit(&mut pending, &mut active, |_| 0);
        assert_eq!(issued, vec![2]);
        assert_eq!(pending.len(), 1);
    }

    // P1: for any set of candidates admitted in one `admit` call, no two
    // issued instructions share a resource key.
    proptest::proptest! {
        #[test]
        fn admit_never_issues_two_instructions_sharing_a_resource_key(
            keys in proptest::collection::vec(0u32..4, 1..8),
        ) {
            let mut scheduler = Scheduler::new(10);
            let mut pending = VecDeque::new();
            let mut active = HashMap::new();
            for (i, key) in keys.iter().enumerate() {
                pending.push_back(instr((i + 1) as InstructionId, &[&format!("task:{key}")]));
            }

            let issued = scheduler.admit(&mut pending, &mut active, |_| 0);

            let mut seen = HashSet::new();
            for id in &issued {
                let instruction = &active[id];
                for key in &instruction.resource_keys {
                    proptest::prop_assert!(seen.insert(key.clone()), "resource key {:?} issued twice in one admit() call", key);
                }
            }
        }
    }
}
