//! Client for the device-management API endpoints
//!
//! List calls (`devices`, `locations/`) feed the device directory and are
//! fail-fast: any problem is an [`ApiError`]. Single-device calls return an
//! [`Outcome`] so that one bad device never aborts a batch.

use crate::core::error::{ApiError, Result};
use crate::core::outcome::{Failure, Outcome, ResponseBody, Stage};
use crate::device::models::{
    DeviceListResponse, DeviceRecord, DeviceSummary, Location, LocationListResponse,
};
use crate::device::traits::{ApiRequest, Transport};
use log::debug;
use serde::de::DeserializeOwned;
use serde_json::json;

const DEVICES_PATH: &str = "devices";
const LOCATIONS_PATH: &str = "locations/";

/// Client for the device-management API over any [`Transport`]
pub struct ApiClient<T: Transport> {
    transport: T,
}

impl<T: Transport> ApiClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Access the underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Fetch every device visible to the account
    pub fn get_devices(&self) -> Result<Vec<DeviceSummary>> {
        let list: DeviceListResponse = self.fetch_list(ApiRequest::get(DEVICES_PATH))?;
        debug!("Fetched {} device(s)", list.devices.len());
        Ok(list.devices)
    }

    /// Fetch the devices assigned to one location
    pub fn get_devices_in_location(&self, location_id: &str) -> Result<Vec<DeviceSummary>> {
        let request = ApiRequest::get(DEVICES_PATH).with_query("location", location_id);
        let list: DeviceListResponse = self.fetch_list(request)?;
        debug!(
            "Fetched {} device(s) in location {}",
            list.devices.len(),
            location_id
        );
        Ok(list.devices)
    }

    /// Fetch every location
    pub fn get_locations(&self) -> Result<Vec<Location>> {
        let list: LocationListResponse = self.fetch_list(ApiRequest::get(LOCATIONS_PATH))?;
        debug!("Fetched {} location(s)", list.locations.len());
        Ok(list.locations)
    }

    /// Fetch a single device record
    ///
    /// A blank identifier is rejected without sending anything: the API would
    /// answer `devices/` with the full listing instead of one device.
    pub fn get_device(&self, udid: &str, include_apps: bool) -> Outcome<DeviceRecord> {
        if udid.trim().is_empty() {
            return Failure::blank_identifier().into();
        }

        let request = ApiRequest::get(device_path(udid))
            .with_query("includeApps", if include_apps { "true" } else { "false" });

        let response = match self.transport.send(&request) {
            Ok(response) => response,
            Err(e) => return Failure::transport(Stage::FetchCurrent, &e).into(),
        };

        let body = ResponseBody::parse(&response.body);
        if !response.is_success() {
            return Failure::http_status(Stage::FetchCurrent, response.status, body).into();
        }

        let device = body
            .as_json()
            .and_then(|value| value.get("device"))
            .cloned()
            .and_then(DeviceRecord::from_value);

        match device {
            Some(record) => Outcome::success(response.status, record),
            None => Failure::unexpected_shape(Stage::FetchCurrent, "missing 'device' key")
                .with_status(response.status)
                .with_response(body)
                .into(),
        }
    }

    /// POST the `details` of a device with the given notes
    ///
    /// The notes are sent exactly as given; callers decide whether that is an
    /// append or an overwrite.
    pub fn post_device_notes(&self, udid: &str, notes: &str) -> Outcome {
        if udid.trim().is_empty() {
            return Failure::blank_identifier().into();
        }

        let request = ApiRequest::post_json(
            format!("{}/details", device_path(udid)),
            json!({ "udid": udid, "notes": notes }),
        );

        let response = match self.transport.send(&request) {
            Ok(response) => response,
            Err(e) => return Failure::transport(Stage::Submit, &e).into(),
        };

        let body = ResponseBody::parse(&response.body);
        if response.is_success() {
            Outcome::success(response.status, body)
        } else {
            Failure::http_status(Stage::Submit, response.status, body).into()
        }
    }

    fn fetch_list<L: DeserializeOwned>(&self, request: ApiRequest) -> Result<L> {
        let response = self.transport.send(&request)?;
        if !response.is_success() {
            return Err(ApiError::Status {
                path: request.path.clone(),
                status: response.status,
                body: response.body,
            });
        }
        serde_json::from_str(&response.body).map_err(|e| ApiError::Decode {
            path: request.path.clone(),
            message: e.to_string(),
        })
    }
}

/// `devices/<udid>` with the identifier encoded as a single path segment
fn device_path(udid: &str) -> String {
    format!("{}/{}", DEVICES_PATH, urlencoding::encode(udid))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::outcome::FailureKind;
    use crate::device::models::NotesField;
    use crate::device::traits::{Method, TransportError};
    use crate::testdb::{Fault, MockApi, MockDevice};

    fn fleet() -> MockApi {
        MockApi::new()
            .with_location("1", "Main Campus")
            .with_device(MockDevice::new("udid-1", "SN001", "iPad 1").with_notes("first"))
            .with_device(MockDevice::new("udid-2", "SN002", "iPad 2").in_location("1"))
    }

    #[test]
    fn test_get_devices() {
        let api = fleet();
        let client = ApiClient::new(&api);
        let devices = client.get_devices().unwrap();
        assert_eq!(devices.len(), 2);
        assert_eq!(api.requests()[0], ApiRequest::get("devices"));
    }

    #[test]
    fn test_get_devices_in_location_sends_filter() {
        let api = fleet();
        let client = ApiClient::new(&api);
        let devices = client.get_devices_in_location("1").unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].udid, "udid-2");
        assert_eq!(api.requests()[0].query_value("location"), Some("1"));
    }

    #[test]
    fn test_list_failures_are_errors() {
        let api = fleet().with_fault(Fault::status(Method::Get, "devices", 401, "unauthorized"));
        let client = ApiClient::new(&api);
        match client.get_devices() {
            Err(ApiError::Status { status, .. }) => assert_eq!(status, 401),
            other => panic!("expected status error, got {:?}", other),
        }

        let api = fleet().with_fault(Fault::timeout(Method::Get, "locations"));
        let client = ApiClient::new(&api);
        assert!(matches!(
            client.get_locations(),
            Err(ApiError::Transport(TransportError::Timeout(_)))
        ));

        let api = fleet().with_fault(Fault::body(Method::Get, "devices", 200, "{\"code\":200}"));
        let client = ApiClient::new(&api);
        assert!(matches!(client.get_devices(), Err(ApiError::Decode { .. })));
    }

    #[test]
    fn test_get_device() {
        let api = fleet();
        let client = ApiClient::new(&api);
        let outcome = client.get_device("udid-1", false);
        let record = outcome.value().unwrap();
        assert_eq!(record.serial_number(), Some("SN001"));
        assert_eq!(record.notes_field(), NotesField::Text("first"));
        assert_eq!(api.requests()[0].query_value("includeApps"), Some("false"));
    }

    #[test]
    fn test_get_device_blank_identifier() {
        let api = fleet();
        let client = ApiClient::new(&api);
        let outcome = client.get_device("", true);
        assert_eq!(
            outcome.failure().map(|f| f.kind),
            Some(FailureKind::BlankIdentifier)
        );
        assert_eq!(api.request_count(), 0);
    }

    #[test]
    fn test_get_device_unknown_is_http_failure() {
        let api = fleet();
        let client = ApiClient::new(&api);
        let outcome = client.get_device("nope", false);
        let failure = outcome.failure().unwrap();
        assert_eq!(failure.kind, FailureKind::HttpStatus);
        assert_eq!(failure.status, Some(404));
        assert!(failure.response.is_some());
    }

    #[test]
    fn test_get_device_missing_device_key() {
        let api = fleet().with_fault(Fault::body(Method::Get, "devices/udid-1", 200, "{\"code\":200}"));
        let client = ApiClient::new(&api);
        let failure = client.get_device("udid-1", false).into_result().unwrap_err();
        assert_eq!(failure.kind, FailureKind::UnexpectedShape);
        assert_eq!(failure.status, Some(200));
        assert_eq!(failure.error.as_deref(), Some("missing 'device' key"));
    }

    #[test]
    fn test_post_device_notes_body() {
        let api = fleet();
        let client = ApiClient::new(&api);
        let outcome = client.post_device_notes("udid-2", "fresh");
        assert!(outcome.is_ok());
        let request = &api.requests()[0];
        assert_eq!(request.method, Method::Post);
        assert_eq!(request.path, "devices/udid-2/details");
        assert_eq!(
            request.body,
            Some(json!({"udid": "udid-2", "notes": "fresh"}))
        );
        assert_eq!(api.notes_of("udid-2").as_deref(), Some("fresh"));
    }

    #[test]
    fn test_identifier_is_a_single_path_segment() {
        let api = fleet().with_device(MockDevice::new("lab/ipad?1#2", "SN003", "Odd iPad"));
        let client = ApiClient::new(&api);

        let record = client.get_device("lab/ipad?1#2", false).into_result().unwrap();
        assert_eq!(record.serial_number(), Some("SN003"));
        assert!(client.post_device_notes("lab/ipad?1#2", "checked").is_ok());

        let requests = api.requests();
        assert_eq!(requests[0].path, "devices/lab%2Fipad%3F1%232");
        assert_eq!(requests[0].query, vec![("includeApps".to_string(), "false".to_string())]);
        assert_eq!(requests[1].path, "devices/lab%2Fipad%3F1%232/details");
        assert_eq!(api.notes_of("lab/ipad?1#2").as_deref(), Some("checked"));
    }
}
