//! Built-in operation catalog
//!
//! Covers the operations the report and feed flows depend on plus a handful
//! of commonly used endpoints. Further operations can be added at runtime
//! through [`EndpointRegistry::register`].

use spapi_domain::GrantlessScope::{ClientCredentialRotation, Notifications};
use spapi_domain::HttpMethod::{Delete, Get, Post};
use spapi_domain::{GrantlessScope, HttpMethod};

use super::{EndpointRegistry, OperationTemplate};

/// `(operation, method, path, restore rate in seconds, grantless scope)`
type Row = (&'static str, HttpMethod, &'static str, f64, Option<GrantlessScope>);

const CATALOG: &[(&str, &str, &[Row])] = &[
    (
        "reports",
        "2021-06-30",
        &[
            ("getReports", Get, "/reports/2021-06-30/reports", 45.0, None),
            ("createReport", Post, "/reports/2021-06-30/reports", 60.0, None),
            ("getReport", Get, "/reports/2021-06-30/reports/{reportId}", 0.5, None),
            ("cancelReport", Delete, "/reports/2021-06-30/reports/{reportId}", 45.0, None),
            (
                "getReportDocument",
                Get,
                "/reports/2021-06-30/documents/{reportDocumentId}",
                60.0,
                None,
            ),
        ],
    ),
    (
        "feeds",
        "2021-06-30",
        &[
            ("createFeedDocument", Post, "/feeds/2021-06-30/documents", 2.0, None),
            ("createFeed", Post, "/feeds/2021-06-30/feeds", 120.0, None),
            ("getFeed", Get, "/feeds/2021-06-30/feeds/{feedId}", 0.5, None),
            ("cancelFeed", Delete, "/feeds/2021-06-30/feeds/{feedId}", 0.5, None),
            ("getFeedDocument", Get, "/feeds/2021-06-30/documents/{feedDocumentId}", 45.0, None),
        ],
    ),
    (
        "sellers",
        "v1",
        &[("getMarketplaceParticipations", Get, "/sellers/v1/marketplaceParticipations", 60.0, None)],
    ),
    (
        "finances",
        "v0",
        &[
            ("listFinancialEventGroups", Get, "/finances/v0/financialEventGroups", 2.0, None),
            (
                "listFinancialEventsByGroupId",
                Get,
                "/finances/v0/financialEventGroups/{eventGroupId}/financialEvents",
                2.0,
                None,
            ),
            (
                "listFinancialEventsByOrderId",
                Get,
                "/finances/v0/orders/{orderId}/financialEvents",
                2.0,
                None,
            ),
            ("listFinancialEvents", Get, "/finances/v0/financialEvents", 2.0, None),
        ],
    ),
    (
        "finances",
        "2024-06-19",
        &[("listTransactions", Get, "/finances/2024-06-19/transactions", 2.0, None)],
    ),
    (
        "notifications",
        "v1",
        &[
            ("getDestinations", Get, "/notifications/v1/destinations", 1.0, Some(Notifications)),
            ("createDestination", Post, "/notifications/v1/destinations", 1.0, Some(Notifications)),
            (
                "getDestination",
                Get,
                "/notifications/v1/destinations/{destinationId}",
                1.0,
                Some(Notifications),
            ),
            (
                "deleteDestination",
                Delete,
                "/notifications/v1/destinations/{destinationId}",
                1.0,
                Some(Notifications),
            ),
            (
                "getSubscription",
                Get,
                "/notifications/v1/subscriptions/{notificationType}",
                1.0,
                None,
            ),
            (
                "createSubscription",
                Post,
                "/notifications/v1/subscriptions/{notificationType}",
                1.0,
                None,
            ),
        ],
    ),
    (
        "tokens",
        "2021-03-01",
        &[("createRestrictedDataToken", Post, "/tokens/2021-03-01/restrictedDataToken", 1.0, None)],
    ),
    (
        "applications",
        "2023-11-30",
        &[(
            "rotateApplicationClientSecret",
            Post,
            "/applications/2023-11-30/clientSecret",
            60.0,
            Some(ClientCredentialRotation),
        )],
    ),
];

pub(super) fn register_all(registry: &mut EndpointRegistry) {
    for (endpoint, version, rows) in CATALOG {
        for &(operation, method, path, restore_rate, scope) in *rows {
            let mut template = OperationTemplate::new(method, path).restore_rate(restore_rate);
            template.scope = scope;
            registry.register_template(endpoint, version, operation, template);
        }
    }
}
