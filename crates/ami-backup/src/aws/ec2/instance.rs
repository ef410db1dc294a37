//! Instance discovery

use super::types::TagFilter;
use super::{Ec2Client, ec2_tag_filter};
use anyhow::{Context, Result};
use tracing::debug;

impl Ec2Client {
    /// List instance IDs matching a tag filter, grouped by reservation
    pub async fn describe_instances(&self, filter: &TagFilter) -> Result<Vec<Vec<String>>> {
        let mut reservations = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .describe_instances()
                .filters(ec2_tag_filter(filter))
                .dry_run(false);
            if let Some(token) = &next_token {
                request = request.next_token(token);
            }

            let response = request
                .send()
                .await
                .context("Failed to describe instances")?;

            for reservation in response.reservations() {
                let ids: Vec<String> = reservation
                    .instances()
                    .iter()
                    .filter_map(|i| i.instance_id())
                    .map(|id| id.to_string())
                    .collect();
                reservations.push(ids);
            }

            match response.next_token() {
                Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                _ => break,
            }
        }

        debug!(
            tag = %filter.key,
            reservations = reservations.len(),
            "Found instances"
        );
        Ok(reservations)
    }
}
