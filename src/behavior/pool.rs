//! A pool base behavior plus one behavior per server.

use super::record::Behavior;

/// Behaviors for one proxy: the pool-level base and the per-server entries.
///
/// Entry order follows server declaration order and is significant for
/// equality and for the rendered connection string.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BehaviorPool {
    pub base: Behavior,
    pub entries: Vec<Behavior>,
}

impl BehaviorPool {
    /// A pool with a base and no servers.
    pub fn empty(base: Behavior) -> Self {
        Self {
            base,
            entries: Vec::new(),
        }
    }

    /// Number of server entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the pool has no servers.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Push a server entry inheriting every field from the base.
    pub fn push_inherited(&mut self) -> &mut Behavior {
        self.entries.push(self.base.clone());
        let last = self.entries.len() - 1;
        &mut self.entries[last]
    }

    /// Render the backend connection string, `host:port[:weight]` joined by commas.
    ///
    /// Entries without a host or port are left out.
    pub fn connection_string(&self) -> String {
        self.entries
            .iter()
            .filter_map(Behavior::server_token)
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn server(host: &str, port: u16) -> Behavior {
        Behavior {
            host: host.to_string(),
            port,
            ..Behavior::default()
        }
    }

    #[test]
    fn test_connection_string() {
        let mut pool = BehaviorPool::default();
        pool.entries.push(server("a", 1));
        pool.entries.push(server("", 2));
        let weighted = pool.push_inherited();
        weighted.host = "c".into();
        weighted.port = 3;
        weighted.downstream_weight = 5;

        assert_eq!(pool.connection_string(), "a:1,c:3:5");
    }

    #[test]
    fn test_push_inherited_copies_base() {
        let mut pool = BehaviorPool::empty(Behavior {
            downstream_max: 7,
            ..Behavior::default()
        });
        pool.push_inherited().host = "x".into();

        assert_eq!(pool.entries[0].downstream_max, 7);
        assert_eq!(pool.base.host, "");
    }

    #[test]
    fn test_order_matters() {
        let mut p = BehaviorPool::default();
        p.entries = vec![server("a", 1), server("b", 2)];
        let mut q = p.clone();
        q.entries.reverse();

        assert_ne!(p, q);
    }

    proptest! {
        #[test]
        fn equal_pools_have_equal_len_and_base(
            hosts_p in proptest::collection::vec("[ab]", 0..3),
            hosts_q in proptest::collection::vec("[ab]", 0..3),
            port_p in 0u16..2,
            port_q in 0u16..2,
        ) {
            let build = |hosts: &[String], port: u16| BehaviorPool {
                base: Behavior { port, ..Behavior::default() },
                entries: hosts.iter().map(|h| server(h, 1)).collect(),
            };
            let p = build(&hosts_p, port_p);
            let q = build(&hosts_q, port_q);

            if p == q {
                prop_assert_eq!(p.len(), q.len());
                prop_assert_eq!(&p.base, &q.base);
            }
        }
    }
}
