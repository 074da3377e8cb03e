//! Server-rendered pages
//!
//! Deliberately minimal: plain HTML forms, no template engine, no assets.

use sesame_core::types::ClientInfo;
use sesame_hydra::ConsentSession;

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>{}</title></head>\n\
         <body>\n{}\n</body>\n</html>\n",
        html_escape(title),
        body
    )
}

/// Login form for a pending login challenge
pub fn login_page(challenge: &str, client: &ClientInfo, error: Option<&str>) -> String {
    let mut body = String::new();
    if let Some(msg) = error {
        body.push_str(&format!("<p class=\"error\">{}</p>\n", html_escape(msg)));
    }
    body.push_str(&format!(
        "<h1>Sign in to {}</h1>\n\
         <form method=\"post\" action=\"/auth/login\">\n\
         <input type=\"hidden\" name=\"challenge\" value=\"{}\">\n\
         <input type=\"hidden\" name=\"client_id\" value=\"{}\">\n\
         <input type=\"hidden\" name=\"client_name\" value=\"{}\">\n\
         <label>Username <input type=\"text\" name=\"username\"></label>\n\
         <label>Password <input type=\"password\" name=\"password\"></label>\n\
         <label><input type=\"checkbox\" name=\"rememberme\" value=\"on\"> Remember me</label>\n\
         <button type=\"submit\">Sign in</button>\n\
         </form>",
        html_escape(if client.name.is_empty() {
            &client.id
        } else {
            &client.name
        }),
        html_escape(challenge),
        html_escape(&client.id),
        html_escape(&client.name),
    ));
    page("login-sso", &body)
}

/// Standalone message page (e.g. authorization refusal during consent)
pub fn message_page(msg: &str) -> String {
    page("login-sso", &format!("<p>{}</p>", html_escape(msg)))
}

/// Self-service dashboard: consent grants of the signed-in subject
pub fn dashboard_page(user: Option<&str>, sessions: &[ConsentSession], error: Option<&str>) -> String {
    let mut body = String::new();
    match user {
        None => {
            body.push_str(
                "<h1>Sesame</h1>\n<p><a href=\"/selfservice/login\">Sign in</a></p>",
            );
        }
        Some(subject) => {
            body.push_str(&format!("<h1>Signed in as {}</h1>\n", html_escape(subject)));
            if let Some(msg) = error {
                body.push_str(&format!("<p class=\"error\">{}</p>\n", html_escape(msg)));
            }
            body.push_str("<table>\n<tr><th>Application</th><th>Scopes</th><th>Granted</th><th></th></tr>\n");
            for session in sessions {
                let client = &session.consent_request.client;
                body.push_str(&format!(
                    "<tr><td>{}</td><td>{}</td><td>{}</td>\
                     <td><form method=\"post\" action=\"/selfservice/revoke/{}\">\
                     <button type=\"submit\">Revoke</button></form></td></tr>\n",
                    html_escape(if client.name.is_empty() {
                        &client.id
                    } else {
                        &client.name
                    }),
                    html_escape(&session.grant_scope.join(", ")),
                    session.handled_at.to_rfc3339(),
                    html_escape(&client.id),
                ));
            }
            body.push_str("</table>\n");
            body.push_str(
                "<form method=\"post\" action=\"/selfservice/logout\">\
                 <button type=\"submit\">Sign out</button></form>",
            );
        }
    }
    page("login-sso", &body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markup_sensitive_values_are_escaped() {
        let client = ClientInfo {
            id: "app".to_string(),
            name: "<b>App</b>".to_string(),
        };
        let html = login_page("ch-1", &client, Some("bad & worse"));
        assert!(html.contains("&lt;b&gt;App&lt;/b&gt;"));
        assert!(html.contains("bad &amp; worse"));
        assert!(!html.contains("<b>App</b>"));
    }

    #[test]
    fn dashboard_offers_sign_in_when_anonymous() {
        let html = dashboard_page(None, &[], None);
        assert!(html.contains("/selfservice/login"));
    }
}
