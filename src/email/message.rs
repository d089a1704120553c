use crate::domain::ConsultationRequest;
use chrono::SecondsFormat;
use htmlescape::encode_minimal;

/// The subject line and the two body renderings of a consultation request.
/// The plain-text body carries the submitted values verbatim; the HTML body
/// entity-encodes every one of them.
pub struct EmailMessage {
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

impl EmailMessage {
    pub fn render(consultation: &ConsultationRequest) -> Self {
        let submitter = if consultation.name.is_empty() {
            "Unknown"
        } else {
            consultation.name.as_str()
        };
        let subject = format!(
            "[ViBE Design] Website Consultation Request from {}",
            submitter
        );
        let submitted = consultation
            .submitted_at
            .to_rfc3339_opts(SecondsFormat::Millis, true);

        let text_body = format!(
            "New Consultation Request\n\
             \n\
             Name: {name}\n\
             Email: {email}\n\
             Company: {company}\n\
             Selected Plan: {selected_plan}\n\
             Project Type: {project_type}\n\
             Budget Range: {budget_range}\n\
             \n\
             Project Details:\n\
             {project_details}\n\
             \n\
             Submitted: {submitted}\n\
             IP: {client_ip}\n\
             User-Agent: {user_agent}\n",
            name = consultation.name,
            email = consultation.email,
            company = consultation.company,
            selected_plan = consultation.selected_plan,
            project_type = consultation.project_type,
            budget_range = consultation.budget_range,
            project_details = consultation.project_details,
            submitted = submitted,
            client_ip = consultation.client_ip,
            user_agent = consultation.user_agent,
        );

        let html_body = format!(
            "<h2>New Consultation Request</h2>\
             <p><strong>Name:</strong> {name}</p>\
             <p><strong>Email:</strong> {email}</p>\
             <p><strong>Company:</strong> {company}</p>\
             <p><strong>Selected Plan:</strong> {selected_plan}</p>\
             <p><strong>Project Type:</strong> {project_type}</p>\
             <p><strong>Budget Range:</strong> {budget_range}</p>\
             <p><strong>Project Details:</strong><br>{project_details}</p>\
             <hr>\
             <p><small>Submitted: {submitted}</small></p>\
             <p><small>IP: {client_ip}</small></p>\
             <p><small>User-Agent: {user_agent}</small></p>",
            name = encode_minimal(&consultation.name),
            email = encode_minimal(&consultation.email),
            company = encode_minimal(&consultation.company),
            selected_plan = encode_minimal(&consultation.selected_plan),
            project_type = encode_minimal(&consultation.project_type),
            budget_range = encode_minimal(&consultation.budget_range),
            project_details = encode_minimal(&consultation.project_details).replace('\n', "<br>"),
            submitted = submitted,
            client_ip = encode_minimal(&consultation.client_ip),
            user_agent = encode_minimal(&consultation.user_agent),
        );

        Self {
            subject,
            text_body,
            html_body,
        }
    }
}
