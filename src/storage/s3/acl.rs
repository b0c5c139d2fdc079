use anyhow::{Result, anyhow};
use aws_sdk_s3::operation::get_object_acl::GetObjectAclOutput;
use aws_sdk_s3::types::Permission;

use crate::types::AccessPolicy;
use crate::types::error::S3bulkError;

const ALL_USERS_URI: &str = "http://acs.amazonaws.com/groups/global/AllUsers";
const AUTHENTICATED_USERS_URI: &str =
    "http://acs.amazonaws.com/groups/global/AuthenticatedUsers";
const LOG_DELIVERY_URI: &str = "http://acs.amazonaws.com/groups/s3/LogDelivery";

/// A source object's access control list reduced to the fields that matter
/// for canned ACL translation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AclPolicyDocument {
    pub owner_id: String,
    pub grants: Vec<AclGrant>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AclGrant {
    pub grantee_uri: String,
    pub grantee_id: String,
    pub permission: String,
}

pub fn document_from_acl_output(output: &GetObjectAclOutput) -> AclPolicyDocument {
    let owner_id = output
        .owner()
        .and_then(|owner| owner.id())
        .unwrap_or_default()
        .to_string();

    let grants = output
        .grants()
        .iter()
        .map(|grant| AclGrant {
            grantee_uri: grant
                .grantee()
                .and_then(|grantee| grantee.uri())
                .unwrap_or_default()
                .to_string(),
            grantee_id: grant
                .grantee()
                .and_then(|grantee| grantee.id())
                .unwrap_or_default()
                .to_string(),
            permission: grant
                .permission()
                .map(Permission::as_str)
                .unwrap_or_default()
                .to_string(),
        })
        .collect();

    AclPolicyDocument { owner_id, grants }
}

/// Translates a source ACL to the destination access classification.
///
/// The first grant to the all-users group decides the result. Grants to the
/// authenticated-users or log-delivery groups have no canned equivalent, as
/// does full control granted to any principal other than the owner.
pub fn map_access_policy(document: &AclPolicyDocument) -> Result<AccessPolicy> {
    for grant in &document.grants {
        if grant.grantee_uri == ALL_USERS_URI {
            return Ok(match grant.permission.as_str() {
                "READ" => AccessPolicy::PublicRead,
                "WRITE" => AccessPolicy::PublicReadWrite,
                _ => AccessPolicy::Private,
            });
        }

        if grant.grantee_uri == AUTHENTICATED_USERS_URI
            || grant.grantee_uri == LOG_DELIVERY_URI
        {
            return Err(anyhow!(S3bulkError::NotImplementedAclMapping).context(format!(
                "no canned acl for a grant to \"{}\".",
                grant.grantee_uri
            )));
        }

        if grant.permission == "FULL_CONTROL"
            && (!grant.grantee_uri.is_empty()
                || (!grant.grantee_id.is_empty() && grant.grantee_id != document.owner_id))
        {
            return Err(anyhow!(S3bulkError::NotImplementedAclMapping).context(
                "no canned acl for full control granted to a non-owner.".to_string(),
            ));
        }
    }

    Ok(AccessPolicy::Private)
}
