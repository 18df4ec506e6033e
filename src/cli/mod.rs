//! Command interpreter behind the `lendportal` binary. Every command that maps
//! to a portal screen is routed through the access guard first, and failures
//! come back as text so the shell keeps running.

pub mod outputformatter;

pub use outputformatter::{render_table, render_value};

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{json, Value};

use crate::api::{self, EntityId, EquipmentInput, NewBorrowRequest, RequestStatus};
use crate::error::{AppError, AppResult};
use crate::identity::{GuardDecision, Navigation, Role};
use crate::navigation::NavAction;
use crate::portal::{Dashboard, Portal};

pub const HELP: &str = "\
Commands:
  login <email> <password>          log in and open the dashboard
  logout                            end the session
  whoami                            show the current user and role
  nav                               list navigation links for this session
  go <path>                         navigate to a portal route
  dashboard                         show the dashboard for your role
  equipment list [search]           list equipment (admin)
  equipment show <id>               show one item (admin)
  equipment add <name> <category> <condition> <qty> [description]
  equipment edit <id> <name> <category> <condition> <qty> [description]
  equipment delete <id>
  requests list                     your requests (students) or the pending queue
  requests new <equipmentId> <qty> <start> <end>   dates as YYYY-MM-DD
  approvals list                    pending requests awaiting review
  approvals approve|reject|return <id>
  help                              show this help
  quit | exit                       leave the shell";

const EQUIPMENT_COLUMNS: &[&str] =
    &["equipmentId", "name", "category", "condition", "totalQuantity", "availableQuantity"];
const REQUEST_COLUMNS: &[&str] =
    &["displayId", "equipmentName", "requestedQuantity", "startDate", "endDate", "status"];

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Login { email: String, password: String },
    Logout,
    WhoAmI,
    Nav,
    Go(String),
    Dashboard,
    EquipmentList(Option<String>),
    EquipmentShow(EntityId),
    EquipmentAdd(EquipmentInput),
    EquipmentEdit(EntityId, EquipmentInput),
    EquipmentDelete(EntityId),
    RequestsList,
    RequestsNew(NewBorrowRequest),
    ApprovalsList,
    ApprovalsSet(EntityId, RequestStatus),
    Help,
}

impl Command {
    /// Route whose guard applies to this command, if any.
    pub fn route(&self) -> Option<String> {
        let path = match self {
            Command::Login { .. } | Command::Logout | Command::Nav | Command::Go(_) | Command::Help => return None,
            Command::WhoAmI => "/profile".to_string(),
            Command::Dashboard => "/dashboard".to_string(),
            Command::EquipmentList(_) | Command::EquipmentShow(_) | Command::EquipmentDelete(_) => "/equipment".to_string(),
            Command::EquipmentAdd(_) => "/equipment/add".to_string(),
            Command::EquipmentEdit(id, _) => format!("/equipment/edit/{}", urlencoding::encode(&id.to_string())),
            Command::RequestsList => "/requests".to_string(),
            Command::RequestsNew(_) => "/requests/new".to_string(),
            Command::ApprovalsList | Command::ApprovalsSet(..) => "/approvals".to_string(),
        };
        Some(path)
    }
}

fn usage(text: &str) -> AppError {
    AppError::validation("usage".to_string(), format!("usage: {text}"))
}

/// Split a command line on whitespace, keeping single- or double-quoted runs together.
pub fn split_args(line: &str) -> AppResult<Vec<String>> {
    let mut out = Vec::new();
    let mut cur = String::new();
    let mut quote: Option<char> = None;
    let mut in_token = false;
    for ch in line.chars() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => cur.push(ch),
            None if ch == '"' || ch == '\'' => {
                quote = Some(ch);
                in_token = true;
            }
            None if ch.is_whitespace() => {
                if in_token {
                    out.push(std::mem::take(&mut cur));
                    in_token = false;
                }
            }
            None => {
                cur.push(ch);
                in_token = true;
            }
        }
    }
    if quote.is_some() {
        return Err(AppError::validation("unterminated_quote".to_string(), "missing closing quote".to_string()));
    }
    if in_token {
        out.push(cur);
    }
    Ok(out)
}

fn parse_qty(s: &str) -> AppResult<u32> {
    s.trim()
        .parse::<u32>()
        .map_err(|_| AppError::validation("invalid_quantity".to_string(), format!("'{s}' is not a quantity")))
}

fn parse_date(s: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::validation("invalid_date".to_string(), format!("'{s}' is not a YYYY-MM-DD date")))
}

fn parse_equipment_input(args: &[String]) -> AppResult<EquipmentInput> {
    let input = EquipmentInput {
        name: args[0].clone(),
        category: args[1].clone(),
        condition: args[2].parse()?,
        total_quantity: parse_qty(&args[3])?,
        description: args.get(4).cloned(),
    };
    input.normalized()
}

/// Parse one shell line. Blank lines parse to `None`.
pub fn parse_command(line: &str) -> AppResult<Option<Command>> {
    parse_args(&split_args(line)?)
}

/// Parse an already split argument list, such as process argv.
pub fn parse_args(args: &[String]) -> AppResult<Option<Command>> {
    let Some((head, rest)) = args.split_first() else { return Ok(None) };
    let sub = rest.first().map(|s| s.to_ascii_lowercase());
    let cmd = match (head.to_ascii_lowercase().as_str(), sub.as_deref()) {
        ("login", _) => match rest {
            [email, password] => Command::Login { email: email.clone(), password: password.clone() },
            _ => return Err(usage("login <email> <password>")),
        },
        ("logout", _) => Command::Logout,
        ("whoami", _) => Command::WhoAmI,
        ("nav", _) => Command::Nav,
        ("go", _) => match rest {
            [path] => Command::Go(path.clone()),
            _ => return Err(usage("go <path>")),
        },
        ("dashboard", _) => Command::Dashboard,
        ("help", _) | ("?", _) => Command::Help,
        ("equipment", Some("list")) => Command::EquipmentList(rest.get(1).cloned()),
        ("equipment", Some("show")) => match &rest[1..] {
            [id] => Command::EquipmentShow(id.parse()?),
            _ => return Err(usage("equipment show <id>")),
        },
        ("equipment", Some("add")) => match &rest[1..] {
            a if a.len() == 4 || a.len() == 5 => Command::EquipmentAdd(parse_equipment_input(a)?),
            _ => return Err(usage("equipment add <name> <category> <condition> <qty> [description]")),
        },
        ("equipment", Some("edit")) => match &rest[1..] {
            [id, a @ ..] if a.len() == 4 || a.len() == 5 => Command::EquipmentEdit(id.parse()?, parse_equipment_input(a)?),
            _ => return Err(usage("equipment edit <id> <name> <category> <condition> <qty> [description]")),
        },
        ("equipment", Some("delete")) => match &rest[1..] {
            [id] => Command::EquipmentDelete(id.parse()?),
            _ => return Err(usage("equipment delete <id>")),
        },
        ("requests", Some("list")) => Command::RequestsList,
        ("requests", Some("new")) => match &rest[1..] {
            [eq, qty, start, end] => {
                Command::RequestsNew(NewBorrowRequest::new(eq.parse()?, parse_qty(qty)?, parse_date(start)?, parse_date(end)?))
            }
            _ => return Err(usage("requests new <equipmentId> <qty> <start> <end>")),
        },
        ("approvals", Some("list")) => Command::ApprovalsList,
        ("approvals", Some(action @ ("approve" | "reject" | "return"))) => match &rest[1..] {
            [id] => Command::ApprovalsSet(id.parse()?, action.parse()?),
            _ => return Err(usage("approvals approve|reject|return <id>")),
        },
        (other, _) => {
            return Err(AppError::validation(
                "unknown_command".to_string(),
                format!("unknown command '{other}'; type 'help' for the command list"),
            ))
        }
    };
    Ok(Some(cmd))
}

/// Runs parsed commands against a portal and formats what comes back.
pub struct Shell {
    portal: Portal,
    json: bool,
}

impl Shell {
    pub fn new(portal: Portal) -> Self {
        let json = portal.config().json_output;
        Self { portal, json }
    }

    pub fn portal(&self) -> &Portal { &self.portal }

    pub fn set_json(&mut self, json: bool) { self.json = json; }

    /// Execute one line; errors are rendered into the returned text.
    pub async fn run_line(&self, line: &str) -> String {
        self.run_parsed(parse_command(line)).await
    }

    /// Execute pre-split arguments without re-tokenizing them.
    pub async fn run_args(&self, args: &[String]) -> String {
        self.run_parsed(parse_args(args)).await
    }

    async fn run_parsed(&self, parsed: AppResult<Option<Command>>) -> String {
        let res = match parsed {
            Ok(Some(cmd)) => self.execute(cmd).await,
            Ok(None) => Ok(String::new()),
            Err(e) => Err(e),
        };
        match res {
            Ok(out) => out,
            Err(e) => format!("error: {}", e.user_message()),
        }
    }

    fn render<T: Serialize>(&self, value: &T, columns: Option<&[&str]>) -> AppResult<String> {
        let v = serde_json::to_value(value).map_err(|e| AppError::internal("render".to_string(), e.to_string()))?;
        if self.json {
            return serde_json::to_string_pretty(&v).map_err(|e| AppError::internal("render".to_string(), e.to_string()));
        }
        Ok(match (&v, render_value(&v, columns)) {
            (_, Some(table)) => table,
            (Value::Array(a), None) if a.is_empty() => "(none)".to_string(),
            (Value::Null, None) => "ok".to_string(),
            (other, None) => other.to_string(),
        })
    }

    fn describe_redirect(to: &str, decision: &GuardDecision) -> String {
        match decision {
            GuardDecision::RedirectToLogin => format!("redirected to {to}: log in first"),
            GuardDecision::RedirectToLanding => format!("redirected to {to}: your role cannot open that page"),
            GuardDecision::Allow => format!("redirected to {to}"),
        }
    }

    pub async fn execute(&self, cmd: Command) -> AppResult<String> {
        if let Some(route) = cmd.route() {
            match self.portal.navigate(&route) {
                Navigation::Render(_) => {}
                Navigation::Redirect { to, decision } if !decision.is_allowed() => {
                    return Ok(Self::describe_redirect(&to, &decision));
                }
                Navigation::Redirect { .. } => {}
                Navigation::NotFound(p) => {
                    return Err(AppError::not_found("unknown_route".to_string(), format!("no screen at {p}")));
                }
            }
        }
        let d = self.portal.dispatcher();
        match cmd {
            Command::Help => Ok(HELP.to_string()),
            Command::Login { email, password } => {
                let session = self.portal.login(&email, &password).await?;
                Ok(format!(
                    "logged in as {} ({}); now at {}",
                    email,
                    session.role,
                    self.portal.navigator().current()
                ))
            }
            Command::Logout => {
                self.portal.logout()?;
                Ok("logged out".to_string())
            }
            Command::Nav => {
                let links: Vec<Value> = self
                    .portal
                    .nav_links()
                    .into_iter()
                    .map(|l| match l.action {
                        NavAction::Go(path) => json!({"label": l.label, "target": path}),
                        NavAction::Logout => json!({"label": l.label, "target": "logout"}),
                    })
                    .collect();
                self.render(&links, Some(&["label", "target"]))
            }
            Command::Go(path) => Ok(match self.portal.navigate(&path) {
                Navigation::Render(m) => format!("at {}", m.path),
                Navigation::Redirect { to, decision } => Self::describe_redirect(&to, &decision),
                Navigation::NotFound(p) => format!("no screen at {p}"),
            }),
            Command::WhoAmI => {
                let user = self.portal.call(api::users::me(d)).await?;
                let session = self.portal.session().session()?;
                let v = json!({
                    "name": user.display_name(),
                    "email": user.email,
                    "role": session.as_ref().map(|s| s.role.as_str()),
                    "userId": session.and_then(|s| s.user_id),
                });
                self.render(&v, None)
            }
            Command::Dashboard => {
                let dash = self.portal.dashboard().await?;
                self.render_dashboard(&dash)
            }
            Command::EquipmentList(search) => {
                let items = self.portal.call(api::equipment::list(d, search.as_deref())).await?;
                self.render(&items, Some(EQUIPMENT_COLUMNS))
            }
            Command::EquipmentShow(id) => {
                let item = self.portal.call(api::equipment::get(d, &id)).await?;
                self.render(&item, None)
            }
            Command::EquipmentAdd(input) => {
                let item = self.portal.call(api::equipment::create(d, &input)).await?;
                self.render(&item, None)
            }
            Command::EquipmentEdit(id, input) => {
                let item = self.portal.call(api::equipment::update(d, &id, &input)).await?;
                self.render(&item, None)
            }
            Command::EquipmentDelete(id) => {
                self.portal.call(api::equipment::delete(d, &id)).await?;
                Ok(format!("deleted equipment {id}"))
            }
            Command::RequestsList => {
                let role = self.portal.session().get_role()?;
                let Some(role) = role else {
                    return Err(AppError::extraction("unknown_role".to_string(), "stored session has no recognized role".to_string()));
                };
                let enriched = match role {
                    Role::Student => {
                        let Some(uid) = self.portal.session().user_id()? else {
                            return Err(AppError::validation(
                                "missing_user_id".to_string(),
                                "no user id in the current session".to_string(),
                            ));
                        };
                        self.portal.call(api::requests::enriched_for_user(d, &uid)).await?
                    }
                    Role::Staff | Role::Admin => {
                        let requests = self.portal.call(api::requests::queue_for(d, role, None)).await?;
                        let inventory = self.portal.call(api::equipment::list(d, None)).await?;
                        api::requests::enrich(requests, &inventory)
                    }
                };
                self.render(&enriched, Some(REQUEST_COLUMNS))
            }
            Command::RequestsNew(mut request) => {
                request.user_id = self.portal.session().user_id()?.map(|id| id.parse()).transpose()?;
                match self.portal.call(api::requests::create(d, &request)).await? {
                    Some(created) => self.render(&created, None),
                    None => Ok("request submitted".to_string()),
                }
            }
            Command::ApprovalsList => {
                let pending = self.portal.call(api::requests::by_status(d, RequestStatus::Pending)).await?;
                let inventory = self.portal.call(api::equipment::list(d, None)).await?;
                self.render(&api::requests::enrich(pending, &inventory), Some(REQUEST_COLUMNS))
            }
            Command::ApprovalsSet(id, status) => {
                self.portal.call(api::requests::update_status(d, &id, status)).await?;
                Ok(format!("request {id} marked {status}"))
            }
        }
    }

    fn render_dashboard(&self, dash: &Dashboard) -> AppResult<String> {
        let v = match dash {
            Dashboard::Admin { user, analytics, pending } => json!({
                "welcome": user.display_name(),
                "role": "ADMIN",
                "totalEquipment": analytics.total_equipment,
                "availableItems": analytics.available_items,
                "pendingRequests": dash.pending_count(),
                "queued": pending.len(),
            }),
            Dashboard::Staff { user, .. } => json!({
                "welcome": user.display_name(),
                "role": "STAFF",
                "pendingRequests": dash.pending_count(),
            }),
            Dashboard::Student { user, available, history } => json!({
                "welcome": user.display_name(),
                "role": "STUDENT",
                "availableEquipment": available.len(),
                "myRequests": history.len(),
                "pendingRequests": history.iter().filter(|r| r.status == RequestStatus::Pending).count(),
            }),
        };
        self.render(&v, None)
    }
}
