use alloy::primitives::{Address, B256, Log};
use alloy::rpc::types::Filter;
use alloy::sol_types::SolEvent;

use crate::abi::ArbFactory::RollupCreated;

/// Selects `RollupCreated` logs emitted by one factory deployment.
///
/// `rollup: None` is the wildcard and matches every rollup the factory
/// announces; `Some(address)` narrows the indexed topic to that rollup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollupCreatedFilter {
    factory: Address,
    rollup: Option<Address>,
}

impl RollupCreatedFilter {
    pub fn new(factory: Address, rollup: Option<Address>) -> Self {
        Self { factory, rollup }
    }

    pub fn any(factory: Address) -> Self {
        Self::new(factory, None)
    }

    pub fn rollup(factory: Address, rollup: Address) -> Self {
        Self::new(factory, Some(rollup))
    }

    /// Topic1 value when constrained, left-padded to a word.
    pub fn rollup_topic(&self) -> Option<B256> {
        self.rollup.map(|rollup| rollup.into_word())
    }

    pub fn to_filter(&self) -> Filter {
        let filter = Filter::new()
            .address(self.factory)
            .event_signature(RollupCreated::SIGNATURE_HASH);
        match self.rollup_topic() {
            Some(topic) => filter.topic1(topic),
            None => filter,
        }
    }

    pub fn matches(&self, log: &Log) -> bool {
        if log.address != self.factory {
            return false;
        }

        let topics = log.data.topics();
        if topics.first() != Some(&RollupCreated::SIGNATURE_HASH) {
            return false;
        }

        match self.rollup_topic() {
            Some(expected) => topics.get(1) == Some(&expected),
            None => true,
        }
    }

    /// Decodes a matching log. Logs that match the topics but carry a
    /// malformed payload yield `None` as well.
    pub fn decode(&self, log: &Log) -> Option<RollupCreated> {
        if !self.matches(log) {
            return None;
        }
        RollupCreated::decode_log(log, true)
            .ok()
            .map(|decoded| decoded.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Bytes, LogData, address};

    const FACTORY: Address = address!("fafafafafafafafafafafafafafafafafafafafa");
    const ROLLUP: Address = address!("0101010101010101010101010101010101010101");
    const OTHER: Address = address!("0202020202020202020202020202020202020202");

    fn created(emitter: Address, rollup: Address) -> Log {
        Log {
            address: emitter,
            data: RollupCreated {
                rollupAddress: rollup,
            }
            .encode_log_data(),
        }
    }

    #[test]
    fn wildcard_matches_any_rollup() {
        let filter = RollupCreatedFilter::any(FACTORY);
        assert!(filter.matches(&created(FACTORY, ROLLUP)));
        assert!(filter.matches(&created(FACTORY, OTHER)));
    }

    #[test]
    fn concrete_address_matches_only_its_topic() {
        let filter = RollupCreatedFilter::rollup(FACTORY, ROLLUP);
        assert!(filter.matches(&created(FACTORY, ROLLUP)));
        assert!(!filter.matches(&created(FACTORY, OTHER)));
    }

    #[test]
    fn wildcard_and_none_are_interchangeable() {
        assert_eq!(
            RollupCreatedFilter::new(FACTORY, None),
            RollupCreatedFilter::any(FACTORY)
        );
        assert_eq!(
            RollupCreatedFilter::new(FACTORY, Some(ROLLUP)),
            RollupCreatedFilter::rollup(FACTORY, ROLLUP)
        );
    }

    #[test]
    fn other_emitters_and_events_are_ignored() {
        let filter = RollupCreatedFilter::any(FACTORY);
        assert!(!filter.matches(&created(OTHER, ROLLUP)));

        let unrelated = Log {
            address: FACTORY,
            data: LogData::new_unchecked(
                vec![B256::repeat_byte(0x33), ROLLUP.into_word()],
                Bytes::new(),
            ),
        };
        assert!(!filter.matches(&unrelated));

        let bare = Log {
            address: FACTORY,
            data: LogData::new_unchecked(vec![], Bytes::new()),
        };
        assert!(!filter.matches(&bare));
    }

    #[test]
    fn decode_extracts_rollup_address() {
        let filter = RollupCreatedFilter::any(FACTORY);
        let event = filter.decode(&created(FACTORY, ROLLUP)).unwrap();
        assert_eq!(event.rollupAddress, ROLLUP);

        assert!(
            RollupCreatedFilter::rollup(FACTORY, OTHER)
                .decode(&created(FACTORY, ROLLUP))
                .is_none()
        );
    }

    #[test]
    fn decode_rejects_missing_indexed_topic() {
        let truncated = Log {
            address: FACTORY,
            data: LogData::new_unchecked(vec![RollupCreated::SIGNATURE_HASH], Bytes::new()),
        };
        let filter = RollupCreatedFilter::any(FACTORY);
        assert!(filter.matches(&truncated));
        assert!(filter.decode(&truncated).is_none());
    }

    #[test]
    fn rpc_filter_carries_topics() {
        let filter = RollupCreatedFilter::rollup(FACTORY, ROLLUP).to_filter();
        assert!(filter.address.matches(&FACTORY));
        assert!(!filter.address.matches(&OTHER));
        assert!(filter.topics[0].matches(&RollupCreated::SIGNATURE_HASH));
        assert!(filter.topics[1].matches(&ROLLUP.into_word()));
        assert!(!filter.topics[1].matches(&OTHER.into_word()));

        let wildcard = RollupCreatedFilter::any(FACTORY).to_filter();
        assert!(wildcard.topics[1].is_empty());
    }
}
