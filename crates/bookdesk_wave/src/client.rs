// --- File: crates/bookdesk_wave/src/client.rs ---
use bookdesk_common::HTTP_CLIENT;
use bookdesk_config::WaveConfig;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error};

use crate::error::WaveError;
use crate::logic::InvoiceCreateInput;

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

// --- GraphQL documents ---

const Q_PING: &str = r#"
query Ping($businessId: ID!) {
  business(id: $businessId) { id name }
}"#;

const Q_SCHEMA_CHECK: &str = r#"
query Check($businessId: ID!) {
  business(id: $businessId) {
    id
    name
    products(page: 1, pageSize: 1) { edges { node { id name } } }
  }
}"#;

const Q_LIST_BUSINESSES: &str = r#"
query ListBusinesses {
  businesses(page: 1, pageSize: 50) {
    edges { node { id name } }
  }
}"#;

const Q_LIST_PRODUCTS: &str = r#"
query Products($businessId: ID!) {
  business(id: $businessId) {
    id
    name
    products(page: 1, pageSize: 100) {
      edges { node { id name description } }
    }
  }
}"#;

const Q_GET_CUSTOMER_BY_EMAIL: &str = r#"
query GetCustomer($businessId: ID!, $email: String!) {
  business(id: $businessId) {
    customers(page: 1, pageSize: 1, email: $email) {
      edges { node { id name email } }
    }
  }
}"#;

const M_CREATE_CUSTOMER: &str = r#"
mutation CreateCustomer($input: CustomerCreateInput!) {
  customerCreate(input: $input) {
    didSucceed
    inputErrors { code message path }
    customer { id name email }
  }
}"#;

const M_CREATE_INVOICE: &str = r#"
mutation CreateInvoice($input: InvoiceCreateInput!) {
  invoiceCreate(input: $input) {
    didSucceed
    inputErrors { code message path }
    invoice { id status pdfUrl viewUrl }
  }
}"#;

const M_APPROVE_INVOICE: &str = r#"
mutation Approve($input: InvoiceApproveInput!) {
  invoiceApprove(input: $input) {
    didSucceed
    inputErrors { code message path }
    invoice { id status }
  }
}"#;

// --- Response shapes ---

#[derive(Deserialize, Debug)]
struct Connection<T> {
    #[serde(default = "Vec::new")]
    edges: Vec<Edge<T>>,
}

#[derive(Deserialize, Debug)]
struct Edge<T> {
    node: T,
}

impl<T> Connection<T> {
    fn into_nodes(self) -> Vec<T> {
        self.edges.into_iter().map(|edge| edge.node).collect()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct BusinessSummary {
    pub id: String,
    pub name: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct Product {
    pub id: String,
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Deserialize, Debug)]
struct BusinessData<T> {
    business: Option<T>,
}

#[derive(Deserialize, Debug)]
struct BusinessesData {
    businesses: Option<Connection<BusinessSummary>>,
}

#[derive(Deserialize, Debug)]
struct ProductsBusiness {
    name: Option<String>,
    products: Option<Connection<Product>>,
}

#[derive(Deserialize, Debug)]
struct CustomersBusiness {
    customers: Option<Connection<CustomerNode>>,
}

#[derive(Deserialize, Debug)]
struct CustomerNode {
    id: String,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CreatedInvoice {
    pub id: String,
    pub status: Option<String>,
    pub pdf_url: Option<String>,
    pub view_url: Option<String>,
}

/// One entry of a mutation's `inputErrors`.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct InputError {
    pub code: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub path: Vec<Value>,
}

impl std::fmt::Display for InputError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let path = self
            .path
            .iter()
            .map(|segment| match segment {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(".");
        write!(f, "{}: {}", path, self.message)
    }
}

/// `path: message` entries joined with ` | `, or `failed` when Wave gave none.
pub fn join_input_errors(errors: &[InputError]) -> String {
    if errors.is_empty() {
        return "failed".to_string();
    }
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" | ")
}

/// The common `{ didSucceed, inputErrors, <entity> }` mutation payload.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct MutationPayload<T> {
    #[serde(default)]
    did_succeed: bool,
    #[serde(default = "Vec::new")]
    input_errors: Vec<InputError>,
    #[serde(alias = "customer", alias = "invoice")]
    entity: Option<T>,
}

impl<T> MutationPayload<T> {
    fn check(&self, operation: &'static str) -> Result<(), WaveError> {
        if self.did_succeed {
            Ok(())
        } else {
            Err(WaveError::MutationFailed {
                operation,
                message: join_input_errors(&self.input_errors),
            })
        }
    }

    fn into_entity(self, operation: &'static str) -> Result<T, WaveError> {
        self.check(operation)?;
        self.entity.ok_or_else(|| WaveError::MutationFailed {
            operation,
            message: "response carried no result".to_string(),
        })
    }
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct CustomerCreateData {
    customer_create: Option<MutationPayload<CustomerNode>>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct InvoiceCreateData {
    invoice_create: Option<MutationPayload<CreatedInvoice>>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct InvoiceApproveData {
    invoice_approve: Option<MutationPayload<Value>>,
}

fn graphql_errors(errors: &[Value]) -> String {
    errors
        .iter()
        .map(|e| match e.get("message").and_then(Value::as_str) {
            Some(message) => message.to_string(),
            None => e.to_string(),
        })
        .collect::<Vec<_>>()
        .join(" | ")
}

// --- Client ---

/// A thin Wave GraphQL client.
#[derive(Debug, Clone)]
pub struct WaveClient {
    api_url: String,
    token: String,
}

impl WaveClient {
    pub fn new(api_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            token: token.into(),
        }
    }

    pub fn from_config(wave: &WaveConfig) -> Result<Self, WaveError> {
        let token = wave
            .token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| WaveError::ConfigError("Wave token missing".to_string()))?;
        Ok(Self::new(wave.api_url.clone(), token))
    }

    /// Posts one GraphQL document and decodes `data`.
    ///
    /// A non-JSON body, a non-2xx status, or any top-level `errors` fails
    /// the call.
    pub async fn call<T: DeserializeOwned>(&self, query: &str, variables: Value) -> Result<T, WaveError> {
        let response = HTTP_CLIENT
            .post(&self.api_url)
            .bearer_auth(&self.token)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?;

        let status = response.status();
        let body_text = response.text().await?;
        debug!("Wave API response status: {}", status);

        let body: Value = serde_json::from_str(&body_text).map_err(|_| WaveError::Http {
            status: status.as_u16(),
            body: body_text.clone(),
        })?;

        let errors = body
            .get("errors")
            .and_then(Value::as_array)
            .filter(|errors| !errors.is_empty());
        if let Some(errors) = errors {
            let message = graphql_errors(errors);
            error!("Wave GraphQL error ({}): {}", status, message);
            return Err(WaveError::GraphQl(message));
        }
        if !status.is_success() {
            return Err(WaveError::GraphQl(format!("HTTP {}", status.as_u16())));
        }

        let data = body.get("data").cloned().unwrap_or(Value::Null);
        Ok(serde_json::from_value(data)?)
    }

    pub async fn ping(&self, business_id: &str) -> Result<Option<BusinessSummary>, WaveError> {
        let data: BusinessData<BusinessSummary> =
            self.call(Q_PING, json!({ "businessId": business_id })).await?;
        Ok(data.business)
    }

    /// Like `ping`, but also touches the product catalogue so a token missing
    /// read scopes fails here.
    pub async fn schema_check(&self, business_id: &str) -> Result<Option<BusinessSummary>, WaveError> {
        let data: BusinessData<BusinessSummary> =
            self.call(Q_SCHEMA_CHECK, json!({ "businessId": business_id })).await?;
        Ok(data.business)
    }

    pub async fn list_businesses(&self) -> Result<Vec<BusinessSummary>, WaveError> {
        let data: BusinessesData = self.call(Q_LIST_BUSINESSES, json!({})).await?;
        Ok(data.businesses.map(Connection::into_nodes).unwrap_or_default())
    }

    /// The business name and its products.
    pub async fn list_products(
        &self,
        business_id: &str,
    ) -> Result<(Option<String>, Vec<Product>), WaveError> {
        let data: BusinessData<ProductsBusiness> =
            self.call(Q_LIST_PRODUCTS, json!({ "businessId": business_id })).await?;
        Ok(match data.business {
            Some(business) => (
                business.name,
                business.products.map(Connection::into_nodes).unwrap_or_default(),
            ),
            None => (None, Vec::new()),
        })
    }

    pub async fn find_customer(&self, business_id: &str, email: &str) -> Result<Option<String>, WaveError> {
        let data: BusinessData<CustomersBusiness> = self
            .call(
                Q_GET_CUSTOMER_BY_EMAIL,
                json!({ "businessId": business_id, "email": email }),
            )
            .await?;
        Ok(data
            .business
            .and_then(|b| b.customers)
            .and_then(|c| c.into_nodes().into_iter().next())
            .map(|customer| customer.id))
    }

    pub async fn create_customer(
        &self,
        business_id: &str,
        name: &str,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> Result<String, WaveError> {
        let mut input = json!({ "businessId": business_id, "name": name });
        if let Some(email) = email {
            input["email"] = json!(email);
        }
        if let Some(phone) = phone {
            input["phone"] = json!(phone);
        }
        let data: CustomerCreateData = self.call(M_CREATE_CUSTOMER, json!({ "input": input })).await?;
        let customer = data
            .customer_create
            .ok_or_else(|| missing_payload("customerCreate"))?
            .into_entity("customerCreate")?;
        Ok(customer.id)
    }

    pub async fn create_invoice(&self, input: &InvoiceCreateInput) -> Result<CreatedInvoice, WaveError> {
        let data: InvoiceCreateData = self.call(M_CREATE_INVOICE, json!({ "input": input })).await?;
        data.invoice_create
            .ok_or_else(|| missing_payload("invoiceCreate"))?
            .into_entity("invoiceCreate")
    }

    pub async fn approve_invoice(&self, business_id: &str, invoice_id: &str) -> Result<(), WaveError> {
        let data: InvoiceApproveData = self
            .call(
                M_APPROVE_INVOICE,
                json!({ "input": { "businessId": business_id, "invoiceId": invoice_id } }),
            )
            .await?;
        data.invoice_approve
            .ok_or_else(|| missing_payload("invoiceApprove"))?
            .check("invoiceApprove")
    }
}

fn missing_payload(operation: &'static str) -> WaveError {
    WaveError::MutationFailed {
        operation,
        message: "failed".to_string(),
    }
}
