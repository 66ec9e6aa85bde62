//! Best-effort parsing of the table ARN out of `eventSourceARN`.

use regex::Regex;
use std::sync::LazyLock;

/// `arn:<partition>:dynamodb:<region>:<account>:table/<name>`, optionally
/// followed by an index/stream/backup/export suffix that is not part of the
/// captured table ARN.
static TABLE_ARN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)^
        (?P<table_arn>
            arn
            :(?P<partition>[^:]+)
            :dynamodb
            :(?P<region>[^:]+)
            :(?P<account>[^:]+)
            :table/(?P<name>[A-Za-z0-9_.-]{3,255})
        )
        (/(index|stream|backup|export)/.+)?
        $",
    )
    .unwrap()
});

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableArn {
    /// The matched prefix, up to and including `table/<name>`.
    pub table_arn: String,
    /// The bare table name.
    pub table_name: String,
}

pub fn parse_table_arn(arn: &str) -> Option<TableArn> {
    let caps = TABLE_ARN.captures(arn)?;
    Some(TableArn {
        table_arn: caps["table_arn"].to_owned(),
        table_name: caps["name"].to_owned(),
    })
}
