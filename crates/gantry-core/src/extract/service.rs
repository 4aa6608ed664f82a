//! External service detection: databases, caches, queues.
//!
//! Two signal sources with different weights: an exact dependency-name
//! match yields a high-confidence hint; a connection-string prefix found in
//! source text yields a low-confidence hint. A high hint for a service
//! absorbs any low hint for the same service.

use std::collections::HashMap;

use crate::domain::{DependencyDecl, HintConfidence, ServiceHint, ServiceKind};

/// Exact dependency names that imply a service client.
const DEPENDENCY_SIGNATURES: &[(&str, ServiceKind)] = &[
    ("pg", ServiceKind::Postgres),
    ("postgres", ServiceKind::Postgres),
    ("psycopg2", ServiceKind::Postgres),
    ("psycopg2-binary", ServiceKind::Postgres),
    ("asyncpg", ServiceKind::Postgres),
    ("github.com/lib/pq", ServiceKind::Postgres),
    ("mysql", ServiceKind::Mysql),
    ("mysql2", ServiceKind::Mysql),
    ("mysqlclient", ServiceKind::Mysql),
    ("pymysql", ServiceKind::Mysql),
    ("redis", ServiceKind::Redis),
    ("ioredis", ServiceKind::Redis),
    ("mongodb", ServiceKind::MongoDb),
    ("mongoose", ServiceKind::MongoDb),
    ("pymongo", ServiceKind::MongoDb),
    ("elasticsearch", ServiceKind::Elasticsearch),
    ("@elastic/elasticsearch", ServiceKind::Elasticsearch),
    ("amqplib", ServiceKind::RabbitMq),
    ("pika", ServiceKind::RabbitMq),
    ("kafkajs", ServiceKind::Kafka),
    ("kafka-python", ServiceKind::Kafka),
];

/// Connection-string prefixes searched for in source text.
const TEXT_SIGNATURES: &[(&str, ServiceKind)] = &[
    ("postgres://", ServiceKind::Postgres),
    ("postgresql://", ServiceKind::Postgres),
    ("mysql://", ServiceKind::Mysql),
    ("redis://", ServiceKind::Redis),
    ("mongodb://", ServiceKind::MongoDb),
    ("mongodb+srv://", ServiceKind::MongoDb),
    ("amqp://", ServiceKind::RabbitMq),
];

/// Detect services from dependencies (high confidence) and sampled source
/// text (low confidence). Output is sorted by service id for determinism.
pub fn detect_services<'a>(
    dependencies: &[DependencyDecl],
    source_samples: impl Iterator<Item = &'a str>,
) -> Vec<ServiceHint> {
    let mut best: HashMap<ServiceKind, HintConfidence> = HashMap::new();

    for dep in dependencies {
        let name = dep.name.to_ascii_lowercase();
        for (signature, service) in DEPENDENCY_SIGNATURES {
            if name == *signature {
                best.insert(*service, HintConfidence::High);
            }
        }
    }

    for text in source_samples {
        for (needle, service) in TEXT_SIGNATURES {
            if text.contains(needle) {
                best.entry(*service).or_insert(HintConfidence::Low);
            }
        }
    }

    let mut hints: Vec<ServiceHint> = best
        .into_iter()
        .map(|(service, confidence)| ServiceHint {
            service,
            confidence,
        })
        .collect();
    hints.sort_by(|a, b| a.service.id().cmp(b.service.id()));
    hints
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Ecosystem;

    fn dep(name: &str) -> DependencyDecl {
        DependencyDecl {
            name: name.to_string(),
            version: None,
            ecosystem: Ecosystem::Npm,
        }
    }

    #[test]
    fn dependency_match_is_high_confidence() {
        let hints = detect_services(&[dep("pg")], std::iter::empty());
        assert_eq!(
            hints,
            vec![ServiceHint {
                service: ServiceKind::Postgres,
                confidence: HintConfidence::High,
            }]
        );
    }

    #[test]
    fn source_text_match_is_low_confidence() {
        let source = "const url = process.env.DB ?? 'redis://localhost:6379'";
        let hints = detect_services(&[], [source].into_iter());
        assert_eq!(hints[0].service, ServiceKind::Redis);
        assert_eq!(hints[0].confidence, HintConfidence::Low);
    }

    #[test]
    fn high_hint_absorbs_low_hint_for_same_service() {
        let source = "postgres://db:5432/app";
        let hints = detect_services(&[dep("psycopg2")], [source].into_iter());
        assert_eq!(hints.len(), 1);
        assert_eq!(hints[0].confidence, HintConfidence::High);
    }

    #[test]
    fn results_form_a_set_not_a_boolean() {
        let hints = detect_services(
            &[dep("mysql2"), dep("ioredis")],
            ["amqp://broker:5672"].into_iter(),
        );
        let services: Vec<ServiceKind> = hints.iter().map(|h| h.service).collect();
        assert_eq!(
            services,
            vec![ServiceKind::Mysql, ServiceKind::RabbitMq, ServiceKind::Redis]
        );
    }
}
