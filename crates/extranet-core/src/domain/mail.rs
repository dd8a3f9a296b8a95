//! Outgoing mail and its HTML bodies.

use crate::domain::entities::ExpiredDocument;

/// A message handed to a [`Mailer`](crate::ports::outbound::Mailer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: Vec<String>,
    pub bcc: Vec<String>,
    pub subject: String,
    pub html: String,
}

pub const RESET_SUBJECT: &str = "Récupération de mot de passe";
pub const NEW_ACCOUNT_SUBJECT: &str = "Votre compte a été créé";
pub const EXPIRED_FILES_SUBJECT: &str = "Fichiers qui ont expiré";

/// Escapes text interpolated into HTML bodies.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html><html><body style=\"background-color:#f6f6f6;font-family:'Open Sans',sans-serif;padding:20px\">\
         <div style=\"max-width:600px;margin:0 auto;background-color:#ffffff;padding:20px;border-radius:5px\">\
         <h1 style=\"color:#f05320;font-size:24px\">{title}</h1>{body}\
         <p style=\"margin-top:30px;font-size:12px;color:#999999;text-align:center\">Merci et à bientôt !</p>\
         </div></body></html>"
    )
}

pub fn password_reset(to: &str, first_name: &str, reset_link: &str) -> OutgoingMail {
    let body = format!(
        "<p>Bonjour, {name} !</p>\
         <p>Nous avons reçu une demande de réinitialisation de votre mot de passe. \
         Veuillez cliquer sur le lien ci-dessous pour créer un nouveau mot de passe \
         (durée de validité 15 min) :</p>\
         <p><a href=\"{link}\">Réinitialiser le mot de passe</a></p>\
         <p>Si vous n'avez pas demandé cette réinitialisation, veuillez ignorer ce message.</p>",
        name = escape_html(first_name),
        link = escape_html(reset_link),
    );
    OutgoingMail {
        to: vec![to.to_string()],
        bcc: Vec::new(),
        subject: RESET_SUBJECT.to_string(),
        html: layout("Récupération de mot de passe", &body),
    }
}

pub fn new_account(to: &str, first_name: &str, password: &str, login_url: &str) -> OutgoingMail {
    let body = format!(
        "<p>Bienvenue, {name} !</p>\
         <p>Votre compte a été créé avec succès. Voici vos informations de connexion :</p>\
         <ul style=\"list-style-type:none;padding:0\">\
         <li><strong>Identifiant :</strong> {email}</li>\
         <li><strong>Mot de passe :</strong> {password}</li></ul>\
         <p>Connectez-vous dès maintenant pour commencer à utiliser notre service.</p>\
         <p><a href=\"{url}\">Se connecter</a></p>",
        name = escape_html(first_name),
        email = escape_html(to),
        password = escape_html(password),
        url = escape_html(login_url),
    );
    OutgoingMail {
        to: vec![to.to_string()],
        bcc: Vec::new(),
        subject: NEW_ACCOUNT_SUBJECT.to_string(),
        html: layout("Votre compte a été créé avec succès", &body),
    }
}

/// One notice for every administrator, addressed to `notice_to` with the
/// administrators in Bcc.
pub fn expired_files(notice_to: &str, admins: &[String], files: &[ExpiredDocument]) -> OutgoingMail {
    let list = files
        .iter()
        .map(|f| {
            format!(
                "<li>{name}<br><small><em>Syndicat: {syndicat} | Catégorie: {category}</em></small></li>",
                name = escape_html(&f.file_name),
                syndicat = escape_html(f.syndicat_name.as_deref().unwrap_or("-")),
                category = escape_html(f.category_name.as_deref().unwrap_or("-")),
            )
        })
        .collect::<String>();

    let body = format!(
        "<p>Les documents suivants ont atteint leur date d'expiration :</p><ul>{list}</ul>"
    );
    OutgoingMail {
        to: vec![notice_to.to_string()],
        bcc: admins.to_vec(),
        subject: EXPIRED_FILES_SUBJECT.to_string(),
        html: layout(EXPIRED_FILES_SUBJECT, &body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<b>\"A&B\"</b>"), "&lt;b&gt;&quot;A&amp;B&quot;&lt;/b&gt;");
    }

    #[test]
    fn test_reset_mail_carries_link() {
        let mail = password_reset("a@x.fr", "Alice", "http://front/reset-pwd/abc");
        assert_eq!(mail.to, vec!["a@x.fr"]);
        assert!(mail.html.contains("Bonjour, Alice !"));
        assert!(mail.html.contains("href=\"http://front/reset-pwd/abc\""));
    }

    #[test]
    fn test_expired_notice_lists_files_and_bccs_admins() {
        let files = vec![ExpiredDocument {
            file_id: 1,
            file_name: "PV <2024>.pdf".into(),
            syndicat_name: Some("Le Parc".into()),
            category_name: None,
        }];
        let mail = expired_files("noreply@x.fr", &["a@x.fr".into(), "b@x.fr".into()], &files);

        assert_eq!(mail.subject, "Fichiers qui ont expiré");
        assert_eq!(mail.bcc.len(), 2);
        assert!(mail.html.contains("PV &lt;2024&gt;.pdf"));
        assert!(mail.html.contains("Syndicat: Le Parc | Catégorie: -"));
    }
}
