//! Proxy assignment: bind each planned range to an endpoint, round robin.

use crate::directory::ProxyEndpoint;
use crate::error::DownloadError;
use crate::planner::ChunkRange;

/// A planned byte range bound to the proxy endpoint that will fetch it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub index: usize,
    /// First byte (inclusive).
    pub start: u64,
    /// Last byte (inclusive).
    pub end: u64,
    pub endpoint: ProxyEndpoint,
}

impl Chunk {
    pub fn byte_len(&self) -> u64 {
        self.end - self.start + 1
    }

    pub fn range_header_value(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }
}

/// Round-robin assignment with optional transport-port rotation.
#[derive(Debug, Clone, Default)]
pub struct AssignmentPolicy {
    /// Ports handed out by chunk index to endpoints that carry no hint of their own.
    pub port_hints: Vec<u16>,
}

impl AssignmentPolicy {
    pub fn new(port_hints: Vec<u16>) -> Self {
        Self { port_hints }
    }

    /// Chunk `i` goes to `endpoints[i % len]`. Fails before anything is
    /// fetched when `endpoints` is empty.
    pub fn assign(
        &self,
        ranges: &[ChunkRange],
        endpoints: &[ProxyEndpoint],
    ) -> Result<Vec<Chunk>, DownloadError> {
        if endpoints.is_empty() {
            return Err(DownloadError::NoProxiesAvailable);
        }

        let chunks = ranges
            .iter()
            .map(|r| {
                let mut endpoint = endpoints[r.index % endpoints.len()].clone();
                if endpoint.port_hint.is_none() && !self.port_hints.is_empty() {
                    endpoint.port_hint = Some(self.port_hints[r.index % self.port_hints.len()]);
                }
                Chunk {
                    index: r.index,
                    start: r.start,
                    end: r.end,
                    endpoint,
                }
            })
            .collect();

        Ok(chunks)
    }
}

/// Plain round robin with no port hints.
pub fn assign(
    ranges: &[ChunkRange],
    endpoints: &[ProxyEndpoint],
) -> Result<Vec<Chunk>, DownloadError> {
    AssignmentPolicy::default().assign(ranges, endpoints)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::plan_chunks;

    fn endpoints(names: &[&str]) -> Vec<ProxyEndpoint> {
        names.iter().map(|n| ProxyEndpoint::new(*n)).collect()
    }

    #[test]
    fn five_chunks_over_three_endpoints() {
        let ranges = plan_chunks(50, 5).unwrap();
        let chunks = assign(&ranges, &endpoints(&["A", "B", "C"])).unwrap();
        let got: Vec<&str> = chunks.iter().map(|c| c.endpoint.url.as_str()).collect();
        assert_eq!(got, vec!["A", "B", "C", "A", "B"]);
        for (c, r) in chunks.iter().zip(&ranges) {
            assert_eq!((c.index, c.start, c.end), (r.index, r.start, r.end));
        }
    }

    #[test]
    fn assignment_is_deterministic() {
        let ranges = plan_chunks(1000, 7).unwrap();
        let eps = endpoints(&["A", "B", "C"]);
        assert_eq!(assign(&ranges, &eps).unwrap(), assign(&ranges, &eps).unwrap());
    }

    #[test]
    fn empty_directory_is_rejected() {
        let ranges = plan_chunks(10, 2).unwrap();
        assert!(matches!(
            assign(&ranges, &[]),
            Err(DownloadError::NoProxiesAvailable)
        ));
    }

    #[test]
    fn port_hints_rotate_unless_endpoint_has_one() {
        let ranges = plan_chunks(40, 4).unwrap();
        let eps = vec![
            ProxyEndpoint::new("A"),
            ProxyEndpoint::new("B").with_port_hint(9000),
        ];
        let policy = AssignmentPolicy::new(vec![4444, 4447]);
        let chunks = policy.assign(&ranges, &eps).unwrap();
        let hints: Vec<Option<u16>> = chunks.iter().map(|c| c.endpoint.port_hint).collect();
        assert_eq!(hints, vec![Some(4444), Some(9000), Some(4444), Some(9000)]);
    }

    #[test]
    fn chunk_len_and_range_header() {
        let c = Chunk {
            index: 0,
            start: 33,
            end: 65,
            endpoint: ProxyEndpoint::new("A"),
        };
        assert_eq!(c.byte_len(), 33);
        assert_eq!(c.range_header_value(), "bytes=33-65");
    }
}
